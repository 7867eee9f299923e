#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::stream;
use serde_json::{json, Value};

use prd_studio::api::ApiClient;
use prd_studio::config::Settings;
use prd_studio::keys::ApiKeys;

/// Serves `app` on an ephemeral port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn client(base_url: &str, keys: ApiKeys) -> ApiClient {
    let settings = Settings {
        api_base_url: base_url.to_string(),
        ..Settings::default()
    };
    ApiClient::new(&settings, keys).unwrap()
}

pub fn frame(event: &str, data: Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

/// An SSE response whose body arrives in `chunk_size`-byte pieces.
pub fn sse_response(body: String, chunk_size: usize) -> Response {
    let chunks: Vec<Result<Bytes, std::io::Error>> = body
        .as_bytes()
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream::iter(chunks)),
    )
        .into_response()
}

pub fn message_json(id: &str, role: &str, content: &str, sequence: i64) -> Value {
    json!({
        "id": id,
        "conversation_id": "c1",
        "role": role,
        "content": content,
        "sequence": sequence,
        "created_at": "2025-01-15T10:30:00.123456"
    })
}

pub fn conversation_json(messages: Vec<Value>) -> Value {
    json!({
        "id": "c1",
        "project_id": "p1",
        "title": "Login",
        "status": "active",
        "created_at": "2025-01-15T10:00:00",
        "updated_at": "2025-01-15T10:30:00",
        "messages": messages
    })
}
