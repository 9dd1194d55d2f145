//!  Delulu Airfare Scout
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Telegram delivery against a local stand-in for the Bot API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use delulu_airfare_scout::{Delivery, PageQueue, TelegramConfig, TelegramSink};
use serde_json::{Value, json};

const TOKEN: &str = "123456:test-token";

#[derive(Clone, Default)]
struct FakeBotApi {
    received: Arc<Mutex<Vec<Value>>>,
    /// Number of upcoming calls answered with a 502.
    failures_left: Arc<AtomicUsize>,
    /// Answer 200 with `ok: false`.
    reject: bool,
}

async fn send_message(
    State(api): State<FakeBotApi>,
    Path(bot): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if bot != format!("bot{}", TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"})),
        );
    }
    if api
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({"ok": false, "description": "Bad Gateway"})),
        );
    }
    if api.reject {
        return (
            StatusCode::OK,
            Json(json!({"ok": false, "description": "Bad Request: can't parse entities"})),
        );
    }
    api.received.lock().unwrap().push(body);
    (StatusCode::OK, Json(json!({"ok": true, "result": {"message_id": 1}})))
}

/// Starts the fake API and returns its base URL.
async fn serve(api: FakeBotApi) -> String {
    let app = Router::new()
        .route("/:bot/sendMessage", post(send_message))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn sink(base: &str, token: &str, retries: u32) -> TelegramSink {
    let config = TelegramConfig::from_parts(Some(token.to_string()), Some("-100200300".into()));
    TelegramSink::new(config, 5)
        .unwrap()
        .with_api_base(base)
        .with_queue(
            PageQueue::with_concurrency_limit(1)
                .max_retries(retries)
                .initial_delay(Duration::from_millis(10)),
        )
}

#[tokio::test]
async fn test_delivers_markdown_message() {
    let api = FakeBotApi::default();
    let base = serve(api.clone()).await;

    let delivery = sink(&base, TOKEN, 0)
        .send_text("✈️ *TYO → CMB* 86,344円")
        .await
        .unwrap();

    assert_eq!(delivery, Delivery::Sent(1));
    let received = api.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["chat_id"], "-100200300");
    assert_eq!(received[0]["parse_mode"], "Markdown");
    assert_eq!(received[0]["text"], "✈️ *TYO → CMB* 86,344円");
}

#[tokio::test]
async fn test_long_message_is_split() {
    let api = FakeBotApi::default();
    let base = serve(api.clone()).await;
    let line = format!("{}\n", "x".repeat(99));
    let text = line.repeat(60);

    let delivery = sink(&base, TOKEN, 0).send_text(&text).await.unwrap();

    assert_eq!(delivery, Delivery::Sent(2));
    let received = api.received.lock().unwrap();
    let rebuilt: String = received
        .iter()
        .map(|body| body["text"].as_str().unwrap())
        .collect();
    assert_eq!(rebuilt, text);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let api = FakeBotApi::default();
    api.failures_left.store(1, Ordering::SeqCst);
    let base = serve(api.clone()).await;

    let delivery = sink(&base, TOKEN, 2).send_text("hello").await.unwrap();

    assert_eq!(delivery, Delivery::Sent(1));
    assert_eq!(api.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_wrong_token_fails_without_leaking_it() {
    let base = serve(FakeBotApi::default()).await;

    let err = sink(&base, "999:wrong-secret", 0)
        .send_text("hello")
        .await
        .unwrap_err();

    let chain = format!("{:#}", err);
    assert!(chain.contains("401"), "{}", chain);
    assert!(!chain.contains("wrong-secret"), "{}", chain);
}

#[tokio::test]
async fn test_rejected_message_is_an_error() {
    let api = FakeBotApi {
        reject: true,
        ..Default::default()
    };
    let base = serve(api).await;

    let err = sink(&base, TOKEN, 0).send_text("*unbalanced").await.unwrap_err();
    assert!(format!("{:#}", err).contains("can't parse entities"));
}
