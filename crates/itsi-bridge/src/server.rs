//! HTTP server exposing the request handlers.
//!
//! Each endpoint takes the same request envelope splunkd would pass to a
//! persistent handler and replies with the handler's status code and payload.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{self, CommentHandler, HandlerResponse, RequestHandler, ResponseHandler};
use crate::platform::{PinnedConnector, PlatformConnector};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Opens a platform per request; only the configured splunkd is accepted.
    connector: Arc<dyn PlatformConnector>,
    comment: Arc<CommentHandler>,
    response: Arc<ResponseHandler>,
}

impl AppState {
    /// Requests naming any `server.rest_uri` other than `splunkd_uri` get the
    /// generic 400 without any outbound call.
    pub fn new(
        connector: Arc<dyn PlatformConnector>,
        splunkd_uri: &str,
        response: ResponseHandler,
    ) -> Self {
        Self {
            connector: Arc::new(PinnedConnector::new(connector, splunkd_uri)),
            comment: Arc::new(CommentHandler),
            response: Arc::new(response),
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            warn!(status = self.status, "Handler returned an invalid status code");
            StatusCode::BAD_REQUEST
        });
        (status, Json(self.payload)).into_response()
    }
}

/// Build the HTTP router for the handlers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/comment", post(comment_endpoint))
        .route("/response", post(response_endpoint))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run(handler: &dyn RequestHandler, state: &AppState, body: &str) -> HandlerResponse {
    handlers::handle(handler, state.connector.as_ref(), body).await
}

async fn comment_endpoint(State(state): State<AppState>, body: String) -> HandlerResponse {
    run(state.comment.as_ref(), &state, &body).await
}

async fn response_endpoint(State(state): State<AppState>, body: String) -> HandlerResponse {
    run(state.response.as_ref(), &state, &body).await
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
