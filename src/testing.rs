//! In-process stand-in for the alt-text generation service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::{Mutex, Notify},
};

use crate::models::ImageUpload;

#[derive(Clone)]
enum ReplyBody {
    Json(Value),
    Raw(&'static str),
}

#[derive(Clone)]
pub struct MockReply {
    status: StatusCode,
    body: ReplyBody,
    delay: Duration,
    gated: bool,
}

impl MockReply {
    pub fn ok(body: Value) -> Self {
        Self::status(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: ReplyBody::Json(body),
            delay: Duration::ZERO,
            gated: false,
        }
    }

    pub fn raw(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body: ReplyBody::Raw(body),
            delay: Duration::ZERO,
            gated: false,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Hold every response until `MockService::release` is called.
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }
}

#[derive(Debug, Default, Clone)]
pub struct ReceivedUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub word_limit: Option<String>,
}

pub struct MockService {
    reply: MockReply,
    hits: AtomicUsize,
    received: Mutex<Vec<ReceivedUpload>>,
    arrived: Notify,
    release: Notify,
}

impl MockService {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn received(&self) -> Vec<ReceivedUpload> {
        self.received.lock().await.clone()
    }

    /// Resolves once a request body has been fully read.
    pub async fn wait_for_request(&self) {
        self.arrived.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

async fn handle_generate(
    State(service): State<Arc<MockService>>,
    mut multipart: Multipart,
) -> Response {
    service.hits.fetch_add(1, Ordering::SeqCst);

    let mut upload = ReceivedUpload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            }
            Some("word_limit") => upload.word_limit = field.text().await.ok(),
            _ => {}
        }
    }
    service.received.lock().await.push(upload);
    service.arrived.notify_one();

    if service.reply.gated {
        service.release.notified().await;
    }
    if !service.reply.delay.is_zero() {
        tokio::time::sleep(service.reply.delay).await;
    }

    match &service.reply.body {
        ReplyBody::Json(body) => (service.reply.status, Json(body.clone())).into_response(),
        ReplyBody::Raw(body) => (service.reply.status, *body).into_response(),
    }
}

pub async fn spawn_generation_service(reply: MockReply) -> (String, Arc<MockService>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("mock addr");

    let service = Arc::new(MockService {
        reply,
        hits: AtomicUsize::new(0),
        received: Mutex::new(Vec::new()),
        arrived: Notify::new(),
        release: Notify::new(),
    });
    let app = Router::new()
        .route("/generate-alt-text", post(handle_generate))
        .with_state(service.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), service)
}

pub fn sample_upload() -> ImageUpload {
    ImageUpload {
        file_name: "bicycle.png".to_string(),
        content_type: Some("image/png".to_string()),
        bytes: b"\x89PNG\r\n\x1a\nnot-really-pixels".to_vec(),
    }
}
