//! Webhook HTTP endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::ParseError;
use crate::inbound::{InboundForm, UploadedFile};
use crate::relay::RelayProcessor;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<RelayProcessor>,
}

/// Build the Axum router with the inbound webhook and health routes.
pub fn relay_routes(processor: Arc<RelayProcessor>, max_body_bytes: usize) -> Router {
    let state = AppState { processor };

    Router::new()
        .route("/inbound", post(inbound))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mail-relay"
    }))
}

// ── Inbound webhook ─────────────────────────────────────────────────────

/// POST /inbound
///
/// Always answers 200 `{}`, even for bodies that cannot be read.
async fn inbound(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!(error = %e, "Rejected non-multipart webhook body");
            return Json(serde_json::json!({}));
        }
    };

    match read_form(multipart).await {
        Ok(form) => Json(state.processor.process(&form)),
        Err(e) => {
            error!(error = %e, "Failed to read webhook body");
            Json(serde_json::json!({}))
        }
    }
}

/// Form field carrying the whole MIME message in raw mode.
const RAW_FIELD: &str = "email";

/// Split a multipart body into text fields, file parts and the raw message.
async fn read_form(mut multipart: Multipart) -> Result<InboundForm, ParseError> {
    let mut form = InboundForm::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ParseError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if filename.is_none() && name == RAW_FIELD {
            let raw = field
                .bytes()
                .await
                .map_err(|e| ParseError::Multipart(e.to_string()))?;
            form.raw = Some(raw.to_vec());
        } else if filename.is_some() {
            let content = field
                .bytes()
                .await
                .map_err(|e| ParseError::Multipart(e.to_string()))?;
            form.files.push(UploadedFile {
                field: name,
                filename,
                content_type,
                content: content.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ParseError::Multipart(e.to_string()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
