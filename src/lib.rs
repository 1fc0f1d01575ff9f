pub mod appresult;
pub mod board;
pub mod config;
pub mod journal;
pub mod msg;
pub mod res;
pub mod sanitize;
pub mod spam;
pub mod store;
pub mod throttle;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, HeaderValue, header},
    routing::get,
};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use board::Board;
pub use config::Config;
pub use journal::Journal;
pub use throttle::RequestThrottle;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self'; \
    style-src 'self'; img-src 'self' data:; connect-src 'self'; object-src 'none'; \
    base-uri 'self'; frame-ancestors 'none'; form-action 'self'";

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub board: Arc<Mutex<Board>>,
    pub throttle: RequestThrottle,
    pub journal: Journal,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let mut board = Board::new(config.max_messages, config.spam);
        if config.seed_messages {
            board.seed();
        }

        Self {
            board: Arc::new(Mutex::new(board)),
            throttle: RequestThrottle::new(config.throttle_limits()),
            journal: Journal::new(config.log_dir.clone()),
            config: Arc::new(config),
        }
    }
}

/// Builds the full application router, shared by `main` and the integration tests.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.request_size_limit;

    Router::new()
        .nest("/msg", msg::router())
        .route("/config", get(config::public_config))
        .route("/", get(res::index))
        .route("/script.js", get(res::script))
        .route("/style.css", get(res::style))
        .fallback(res::fallback)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(security_header(
            header::CONTENT_SECURITY_POLICY,
            CONTENT_SECURITY_POLICY,
        ))
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(header::REFERRER_POLICY, "no-referrer"))
        .layer(security_header(
            HeaderName::from_static("cross-origin-resource-policy"),
            "cross-origin",
        ))
        .layer(TraceLayer::new_for_http())
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}
