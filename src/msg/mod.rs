mod del;
mod list;
mod post;

use std::net::IpAddr;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tracing::{error, warn};

use crate::{
    AppError, AppState,
    journal::Category,
    throttle::{ThrottleDecision, ThrottleScope},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/getAll", get(list::get_all))
        .route("/get/{id}", get(list::get_one))
        .route("/nber", get(list::count))
        .route("/post", post(post::post_message))
        .route("/del/{id}", delete(del::delete_message))
}

fn enforce_rate_limit(
    state: &AppState,
    submitter: IpAddr,
    scope: ThrottleScope,
) -> Result<(), AppError> {
    match state.throttle.check(submitter, scope) {
        ThrottleDecision::Allowed => Ok(()),
        ThrottleDecision::Denied { retry_after } => Err(AppError::RateLimited { retry_after }),
    }
}

/// Logs a request that ended at one of the gates.
async fn report_rejection(state: &AppState, action: &str, submitter: IpAddr, err: &AppError) {
    let category = match err {
        AppError::Internal(_) => {
            error!(%submitter, action, "request failed");
            Category::Errors
        },
        _ => {
            warn!(%submitter, action, status = err.status().as_u16(), reason = %err, "request rejected");
            Category::Rejections
        },
    };

    let line = format!("{action} from {submitter}: {} ({err})", err.status().as_u16());
    state.journal.record(category, line).await;
}
