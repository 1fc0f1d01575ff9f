use axum::{
    debug_handler,
    http::{Method, header},
    response::{Html, IntoResponse, Response},
};

use crate::AppError;

#[macro_export]
macro_rules! include_res {
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn index() -> Html<&'static str> {
    Html(include_res!(str, "/index.html"))
}

#[debug_handler]
pub async fn script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        include_res!(str, "/script.js"),
    )
}

#[debug_handler]
pub async fn style() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        include_res!(str, "/style.css"),
    )
}

/// Every unknown `GET` gets the client; anything else is a JSON 404.
pub async fn fallback(method: Method) -> Response {
    if method == Method::GET || method == Method::HEAD {
        return ([(header::CACHE_CONTROL, "no-cache")], index().await).into_response();
    }
    AppError::RouteNotFound.into_response()
}
