use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::task::JoinError;

mod client;
mod config;
mod controller;
mod models;
mod page;
#[cfg(test)]
mod testing;

use client::AltTextClient;
use controller::{SubmitError, Submission, UploadForm};
use models::{ImageUpload, Outcome};

type SharedForm = Arc<UploadForm>;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = config::load_settings();
    let client = AltTextClient::new(&settings).map_err(std::io::Error::other)?;
    tracing::info!(
        endpoint = %client.endpoint(),
        timeout_secs = settings.request_timeout.as_secs(),
        "alt text service configured"
    );

    let form = Arc::new(UploadForm::new(client));
    let app = router(form, settings.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

fn router(form: SharedForm, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .route("/state", get(form_state))
        .route("/retry", post(retry_submit))
        .route("/cancel", post(cancel_request))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(form)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn show_form(State(form): State<SharedForm>) -> Html<String> {
    Html(page::render(&form.snapshot().await, None))
}

async fn form_state(State(form): State<SharedForm>) -> Response {
    Json(form.snapshot().await).into_response()
}

async fn cancel_request(State(form): State<SharedForm>) -> Response {
    let cancelled = form.cancel().await;
    Json(json!({"cancelled": cancelled})).into_response()
}

async fn submit_form(State(form): State<SharedForm>, multipart: Multipart) -> Response {
    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(detail) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"detail": detail}))).into_response()
        }
    };

    // Run detached so a dropped connection cannot strand the form mid-submit.
    let result = tokio::spawn({
        let form = form.clone();
        async move { form.submit_form(submission).await }
    })
    .await;
    submit_response(&form, result).await
}

async fn retry_submit(State(form): State<SharedForm>) -> Response {
    let result = tokio::spawn({
        let form = form.clone();
        async move { form.submit().await }
    })
    .await;
    submit_response(&form, result).await
}

async fn submit_response(
    form: &UploadForm,
    result: Result<Result<Outcome, SubmitError>, JoinError>,
) -> Response {
    let view = form.snapshot().await;
    match result {
        Ok(Ok(_)) => (StatusCode::OK, Html(page::render(&view, None))).into_response(),
        Ok(Err(e)) => {
            let status = match e {
                SubmitError::NoFile => StatusCode::UNPROCESSABLE_ENTITY,
                SubmitError::AlreadySubmitting => StatusCode::CONFLICT,
            };
            let notice = e.to_string();
            (status, Html(page::render(&view, Some(&notice)))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "submit task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Submit task failed"})),
            )
                .into_response()
        }
    }
}

/// Reads the posted fields. A file part without a name or content is what
/// browsers send for an empty file input and counts as no file.
async fn read_submission(mut multipart: Multipart) -> Result<Submission, String> {
    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                submission.file = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("word_limit") => {
                submission.word_limit = Some(field.text().await.map_err(|e| e.to_string())?);
            }
            other => tracing::debug!(field = ?other, "ignoring unknown form field"),
        }
    }
    Ok(submission)
}
