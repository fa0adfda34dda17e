//! HTTP server for command intake and the Prometheus metrics endpoint.
//!
//! - `POST /api/chat.postMessage` with `{"channel": .., "text": ..}` queues a
//!   PRIVMSG and answers `{"ok":true}`
//! - `GET /metrics` returns Prometheus metrics in text format

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::CommandIntake;
use crate::error::IntakeError;

#[derive(Debug, Deserialize)]
struct PostMessage {
    channel: String,
    text: String,
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

fn bad_request(reason: &'static str) -> Response {
    crate::metrics::record_command("bad_request");
    debug!(reason, "Rejected intake request");
    StatusCode::BAD_REQUEST.into_response()
}

async fn post_message(State(intake): State<CommandIntake>, body: Bytes) -> Response {
    let request: PostMessage = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Invalid JSON in intake request");
            return bad_request("invalid JSON");
        }
    };

    match intake.post_message(&request.channel, &request.text).await {
        Ok(()) => {
            crate::metrics::record_command("accepted");
            debug!(channel = %request.channel, "Accepted message from intake");
            Json(json!({ "ok": true })).into_response()
        }
        Err(e @ IntakeError::Invalid(_)) => {
            crate::metrics::record_command(e.error_code());
            warn!(channel = %request.channel, error = %e, "Intake message rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": e.error_code() })),
            )
                .into_response()
        }
        Err(e @ IntakeError::NotConnected) => {
            crate::metrics::record_command(e.error_code());
            warn!("Intake request while the connection is down");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "ok": false, "error": e.error_code() })),
            )
                .into_response()
        }
    }
}

/// Build the intake router.
///
/// Any method other than POST on the intake route answers 400.
pub fn router(intake: CommandIntake) -> Router {
    Router::new()
        .route(
            "/api/chat.postMessage",
            post(post_message).fallback(|| async { bad_request("wrong method") }),
        )
        .route("/metrics", get(metrics_handler))
        .with_state(intake)
}

/// Serve `app` on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Command intake listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
