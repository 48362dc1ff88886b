use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::assets::palette::PaletteTable;
use crate::foundation::error::{PosterError, PosterResult};
use crate::render::output::unique_poster_file_name;
use crate::render::pipeline::PosterJob;
use crate::service::ServiceState;
use crate::service::request::{RenderRequest, RequestError};

/// JSON error reply.
#[derive(Debug)]
pub enum ApiError {
    MissingParameters,
    BadRequest(String),
    NotFound(String),
    Internal { error: String, details: String },
}

impl ApiError {
    fn internal(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut details = err.to_string();
        let mut source = err.source();
        while let Some(s) = source {
            details.push_str(": ");
            details.push_str(&s.to_string());
            source = s.source();
        }
        error!(error = %details, "render request failed");
        Self::Internal {
            error: format!("Internal server error: {err}"),
            details,
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::MissingParameters => Self::MissingParameters,
            RequestError::Invalid(msg) => Self::BadRequest(msg),
        }
    }
}

impl From<PosterError> for ApiError {
    fn from(e: PosterError) -> Self {
        match e {
            PosterError::Config(_) => Self::BadRequest(e.to_string()),
            PosterError::Lookup(_) => Self::NotFound(e.to_string()),
            other => Self::internal(&other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingParameters => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Missing required parameters",
                    "required": ["id", "markdown"],
                })),
            )
                .into_response(),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Internal { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error, "details": details })),
            )
                .into_response(),
        }
    }
}

/// POST /generate_color_picture
pub async fn generate_handler(
    Extension(state): Extension<Arc<ServiceState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req = RenderRequest::from_body(&body)?;
    info!(
        id = req.id,
        direction = %req.direction,
        background = %req.background.to_hex(),
        markdown_len = req.markdown.len(),
        "render request"
    );

    let png = tokio::task::spawn_blocking(move || render_blocking(&state, req))
        .await
        .map_err(|e| ApiError::internal(&e))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

fn render_blocking(state: &ServiceState, req: RenderRequest) -> PosterResult<Vec<u8>> {
    let table = PaletteTable::load(&state.config.palette_path)?;
    let entry = table.find(req.id)?;
    let job = PosterJob {
        stops: entry.stops()?,
        direction: req.direction,
        background: req.background,
        markdown: req.markdown,
    };
    let poster = state.renderer.render(&job)?;

    if state.config.persist_outputs {
        let path = state
            .config
            .output_dir
            .join(unique_poster_file_name(entry.id, &entry.name));
        poster.save(&path)?;
    }
    Ok(poster.png)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "postercard".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
