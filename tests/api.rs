//! End-to-end tests driving the router over a real socket.

use std::{net::SocketAddr, time::Duration};

use noticeboard::{AppState, Config, app, spam::SpamConfig};
use reqwest::{StatusCode, header};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Config that lets a single client post freely.
fn relaxed() -> Config {
    Config {
        post_rate_limit: 1000,
        delete_rate_limit: 1000,
        spam: SpamConfig {
            min_interval: Duration::ZERO,
            ..SpamConfig::default()
        },
        ..Config::default()
    }
}

async fn start_server(config: Config) -> String {
    let app = app(AppState::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

async fn post(base: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/msg/post"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn delete(base: &str, id: &str) -> reqwest::Response {
    reqwest::Client::new()
        .delete(format!("{base}/msg/del/{id}"))
        .send()
        .await
        .unwrap()
}

async fn get_json(url: String) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

async fn bodies(base: &str) -> Vec<String> {
    get_json(format!("{base}/msg/getAll"))
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["msg"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn post_then_list_newest_first() {
    let base = start_server(relaxed()).await;
    assert_eq!(get_json(format!("{base}/msg/getAll")).await, json!([]));

    let resp = post(&base, json!({ "message": "first", "pseudo": "ann" })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 1);
    assert_eq!(body["id"], 0);
    assert!(body["message"].is_string());

    post(&base, json!({ "message": "second" })).await;

    let all = get_json(format!("{base}/msg/getAll")).await;
    assert_eq!(all[0]["msg"], "second");
    assert_eq!(all[0]["pseudo"], "Anonymous");
    assert_eq!(all[1]["msg"], "first");
    assert_eq!(all[1]["pseudo"], "ann");
    assert!(all[0]["date"].is_string());
    assert_eq!(get_json(format!("{base}/msg/nber")).await, json!(2));
}

#[tokio::test]
async fn empty_message_is_rejected_and_store_unchanged() {
    let base = start_server(relaxed()).await;

    for payload in [json!({ "message": "" }), json!({ "message": "   " }), json!({})] {
        let resp = post(&base, payload).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], 0);
        assert!(body["error"].is_string());
    }
    assert_eq!(get_json(format!("{base}/msg/nber")).await, json!(0));
}

#[tokio::test]
async fn markup_is_stripped_before_storing() {
    let base = start_server(relaxed()).await;

    let resp = post(
        &base,
        json!({ "message": "<b>hello</b><script>alert(1)</script>", "pseudo": "<i>eve</i>" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let all = get_json(format!("{base}/msg/getAll")).await;
    assert_eq!(all[0]["msg"], "hello");
    assert_eq!(all[0]["pseudo"], "eve");

    let resp = post(&base, json!({ "message": "<img src=x onerror=alert(1)>" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post(&base, json!({ "message": "<<img>img src=x onerror=alert(1)>" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_json(format!("{base}/msg/nber")).await, json!(1));
}

#[tokio::test]
async fn oversized_fields_are_rejected() {
    let base = start_server(Config {
        max_message_length: 10,
        max_pseudo_length: 3,
        ..relaxed()
    })
    .await;

    let resp = post(&base, json!({ "message": "x".repeat(11) })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post(&base, json!({ "message": "ok", "pseudo": "toolong" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(get_json(format!("{base}/msg/nber")).await, json!(0));
}

#[tokio::test]
async fn malformed_and_oversized_payloads() {
    let base = start_server(Config {
        request_size_limit: 64,
        ..relaxed()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/msg/post"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 0);

    let resp = post(&base, json!({ "message": "y".repeat(200) })).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn capacity_evicts_the_oldest() {
    let base = start_server(Config {
        max_messages: 2,
        ..relaxed()
    })
    .await;

    for body in ["A", "B", "C"] {
        let resp = post(&base, json!({ "message": body })).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(bodies(&base).await, vec!["C", "B"]);
}

#[tokio::test]
async fn delete_removes_exactly_one() {
    let base = start_server(relaxed()).await;
    for body in ["keep me", "drop me", "keep me too"] {
        post(&base, json!({ "message": body })).await;
    }

    let resp = delete(&base, "1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "code": 1 }));
    assert_eq!(bodies(&base).await, vec!["keep me too", "keep me"]);

    let resp = delete(&base, "1").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(bodies(&base).await.len(), 2);

    let resp = delete(&base, "abc").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = delete(&base, "-3").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ids_survive_deletions() {
    let base = start_server(relaxed()).await;
    post(&base, json!({ "message": "zero" })).await;
    post(&base, json!({ "message": "one" })).await;
    delete(&base, "0").await;

    let body: Value = post(&base, json!({ "message": "two" })).await.json().await.unwrap();
    assert_eq!(body["id"], 2);

    let all = get_json(format!("{base}/msg/getAll")).await;
    let ids: Vec<u64> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn get_by_position() {
    let base = start_server(relaxed()).await;
    post(&base, json!({ "message": "oldest" })).await;
    post(&base, json!({ "message": "newest" })).await;

    let found = get_json(format!("{base}/msg/get/0")).await;
    assert_eq!(found["code"], 1);
    assert_eq!(found["msg"]["msg"], "oldest");

    assert_eq!(get_json(format!("{base}/msg/get/2")).await, json!({ "code": 0 }));
    assert_eq!(get_json(format!("{base}/msg/get/nope")).await, json!({ "code": 0 }));
}

#[tokio::test]
async fn post_rate_limit_returns_429() {
    let base = start_server(Config {
        post_rate_limit: 2,
        ..relaxed()
    })
    .await;

    assert_eq!(post(&base, json!({ "message": "one" })).await.status(), StatusCode::OK);
    assert_eq!(post(&base, json!({ "message": "two" })).await.status(), StatusCode::OK);

    let resp = post(&base, json!({ "message": "three" })).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key(header::RETRY_AFTER));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 0);

    assert_eq!(get_json(format!("{base}/msg/nber")).await, json!(2));
}

#[tokio::test]
async fn delete_rate_limit_returns_429() {
    let base = start_server(Config {
        delete_rate_limit: 1,
        ..relaxed()
    })
    .await;
    post(&base, json!({ "message": "a" })).await;
    post(&base, json!({ "message": "b" })).await;

    assert_eq!(delete(&base, "0").await.status(), StatusCode::OK);
    assert_eq!(delete(&base, "1").await.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn cadence_check_rejects_rapid_posts() {
    let base = start_server(Config {
        spam: SpamConfig {
            min_interval: Duration::from_secs(60),
            ..SpamConfig::default()
        },
        ..relaxed()
    })
    .await;

    assert_eq!(post(&base, json!({ "message": "hello" })).await.status(), StatusCode::OK);
    let resp = post(&base, json!({ "message": "something different" })).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("wait"));
}

#[tokio::test]
async fn similar_messages_rejected_after_threshold() {
    let base = start_server(Config {
        spam: SpamConfig {
            min_interval: Duration::ZERO,
            max_similar: 2,
            ..SpamConfig::default()
        },
        ..relaxed()
    })
    .await;

    assert_eq!(post(&base, json!({ "message": "free coins here" })).await.status(), StatusCode::OK);
    assert_eq!(post(&base, json!({ "message": "free coins here" })).await.status(), StatusCode::OK);
    let resp = post(&base, json!({ "message": "free coins here!" })).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("similar"));
}

#[tokio::test]
async fn seeded_board_starts_with_welcome_messages() {
    let base = start_server(Config {
        seed_messages: true,
        ..relaxed()
    })
    .await;

    assert_eq!(get_json(format!("{base}/msg/nber")).await, json!(3));
    let first = get_json(format!("{base}/msg/get/0")).await;
    assert_eq!(first["msg"]["msg"], "Hello World");
    assert_eq!(first["msg"]["pseudo"], "System");
}

#[tokio::test]
async fn config_endpoint_reports_limits() {
    let base = start_server(Config {
        max_messages: 42,
        ..relaxed()
    })
    .await;

    let config = get_json(format!("{base}/config")).await;
    assert_eq!(
        config,
        json!({
            "maxMessages": 42,
            "maxMessageLength": 500,
            "maxPseudoLength": 30,
            "postRateLimit": 1000,
            "deleteRateLimit": 1000,
        })
    );
}

#[tokio::test]
async fn unknown_get_serves_client_with_hardened_headers() {
    let base = start_server(relaxed()).await;

    let resp = reqwest::get(format!("{base}/some/client/route")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers().clone();
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
    assert!(resp.text().await.unwrap().contains("<script src=\"/script.js\">"));

    let resp = reqwest::get(format!("{base}/script.js")).await.unwrap();
    assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().contains("javascript"));

    let resp = reqwest::Client::new()
        .put(format!("{base}/nowhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
