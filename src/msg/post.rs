use std::net::{IpAddr, SocketAddr};

use axum::{
    Json, debug_handler,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    AppError, AppResult, AppState,
    config::Config,
    journal::Category,
    sanitize::strip_markup,
    store::Message,
    throttle::{ThrottleScope, resolve_client_ip},
};

use super::{enforce_rate_limit, report_rejection};

const DEFAULT_AUTHOR: &str = "Anonymous";

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    pseudo: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostMessageResponse {
    code: u8,
    message: &'static str,
    id: u64,
}

#[debug_handler]
pub(crate) async fn post_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<PostMessageBody>, JsonRejection>,
) -> AppResult<Json<PostMessageResponse>> {
    let submitter = resolve_client_ip(&headers, addr, state.config.behind_proxy);

    match accept(&state, submitter, payload).await {
        Ok(message) => {
            info!(%submitter, id = message.id, author = %message.author, "message posted");
            state
                .journal
                .record(
                    Category::Messages,
                    format!("#{} by {} from {submitter}: {}", message.id, message.author, message.body),
                )
                .await;

            Ok(Json(PostMessageResponse {
                code: 1,
                message: "Message added",
                id: message.id,
            }))
        },
        Err(err) => {
            report_rejection(&state, "post", submitter, &err).await;
            Err(err)
        },
    }
}

/// received -> sanitized -> rate-checked -> spam-checked -> stored
async fn accept(
    state: &AppState,
    submitter: IpAddr,
    payload: Result<Json<PostMessageBody>, JsonRejection>,
) -> AppResult<Message> {
    let Json(payload) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::MalformedPayload(rejection.body_text())
        }
    })?;

    let (body, author) = sanitize_submission(&state.config, payload)?;

    enforce_rate_limit(state, submitter, ThrottleScope::Post)?;

    let mut board = state.board.lock().await;
    board
        .submit(submitter, body, author)
        .map_err(AppError::Spam)
}

fn sanitize_submission(config: &Config, payload: PostMessageBody) -> AppResult<(String, String)> {
    let body = strip_markup(&payload.message);
    if body.is_empty() {
        return Err(AppError::EmptyMessage);
    }
    if body.chars().count() > config.max_message_length {
        return Err(AppError::MessageTooLong {
            max: config.max_message_length,
        });
    }

    let pseudo = payload
        .pseudo
        .as_deref()
        .map(strip_markup)
        .filter(|pseudo| !pseudo.is_empty());
    let author = match pseudo {
        Some(pseudo) if pseudo.chars().count() > config.max_pseudo_length => {
            return Err(AppError::PseudoTooLong {
                max: config.max_pseudo_length,
            });
        },
        Some(pseudo) => pseudo,
        None => DEFAULT_AUTHOR.to_owned(),
    };

    Ok((body, author))
}
