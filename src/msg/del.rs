use std::net::{IpAddr, SocketAddr};

use axum::{
    Json, debug_handler,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    AppError, AppResult, AppState,
    journal::Category,
    throttle::{ThrottleScope, resolve_client_ip},
};

use super::{enforce_rate_limit, report_rejection};

#[debug_handler]
pub(crate) async fn delete_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let submitter = resolve_client_ip(&headers, addr, state.config.behind_proxy);

    match remove(&state, submitter, &id).await {
        Ok(id) => {
            info!(%submitter, id, "message deleted");
            state
                .journal
                .record(Category::Deletions, format!("#{id} by {submitter}"))
                .await;
            Ok(Json(json!({ "code": 1 })))
        },
        Err(err) => {
            report_rejection(&state, "delete", submitter, &err).await;
            Err(err)
        },
    }
}

async fn remove(state: &AppState, submitter: IpAddr, raw_id: &str) -> AppResult<u64> {
    let id: u64 = raw_id.trim().parse().map_err(|_| AppError::InvalidId)?;

    enforce_rate_limit(state, submitter, ThrottleScope::Delete)?;

    if !state.board.lock().await.store.remove_by_id(id) {
        return Err(AppError::NotFound);
    }
    Ok(id)
}
