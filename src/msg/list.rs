use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{AppState, store::Message};

#[debug_handler]
pub(crate) async fn get_all(State(state): State<AppState>) -> Json<Vec<Message>> {
    let board = state.board.lock().await;
    Json(board.store.list())
}

#[derive(Debug, Serialize)]
pub(crate) struct GetMessageResponse {
    code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<Message>,
}

/// Looks a message up by its position in posting order, oldest first.
#[debug_handler]
pub(crate) async fn get_one(
    State(state): State<AppState>,
    Path(position): Path<String>,
) -> Json<GetMessageResponse> {
    let board = state.board.lock().await;
    let msg = position
        .parse::<usize>()
        .ok()
        .and_then(|position| board.store.get(position))
        .cloned();

    Json(GetMessageResponse {
        code: u8::from(msg.is_some()),
        msg,
    })
}

#[debug_handler]
pub(crate) async fn count(State(state): State<AppState>) -> Json<usize> {
    Json(state.board.lock().await.store.len())
}
