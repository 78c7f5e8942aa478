use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::upstream::UpstreamClient;

/// The only failure message the proxy ever returns. Upstream detail stays
/// in the server log.
pub const GENERIC_ERROR: &str = "AI request failed";

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub text: String,
}

/// Collapses every internal failure into the fixed generic payload.
#[derive(Debug)]
pub struct ProxyError(anyhow::Error);

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "ask request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": GENERIC_ERROR })),
        )
            .into_response()
    }
}

impl<E> From<E> for ProxyError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn router(upstream: UpstreamClient) -> Router {
    Router::new()
        .route("/api/ai", post(ask))
        .with_state(Arc::new(upstream))
}

/// `POST /api/ai`. Stateless: exactly one upstream call per invocation.
async fn ask(
    State(upstream): State<Arc<UpstreamClient>>,
    Json(request): Json<AskRequest>,
) -> std::result::Result<Json<AskResponse>, ProxyError> {
    let text = upstream.ask(&request.prompt).await?;
    Ok(Json(AskResponse { text }))
}

/// Bind and run the proxy until interrupted.
pub async fn serve(port: u16, upstream: UpstreamClient) -> Result<()> {
    let app = router(upstream);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("truth tortoise proxy listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
