//! HTTP operation surface
//!
//! Six JSON-over-POST operations behind an axum router with permissive
//! CORS and request tracing. Response bodies are a hard contract: no
//! stack traces, no store error text, no field beyond the documented
//! shapes ever leaves a handler — the adversary model includes the API
//! consumer itself. Internal detail goes to `tracing` only.

use crate::honeypot::{HoneypotClassifier, TrapType};
use crate::rate_limit::{RateLimiter, ACTION_CREATE_SESSION};
use crate::registry::SessionRegistry;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use ghostline_core::{Fingerprint, GhostError, SessionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

/// Shared state for the axum handlers
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle state machine
    pub registry: Arc<SessionRegistry>,
    /// Per-origin creation limiter
    pub limiter: Arc<RateLimiter>,
    /// Trap/probe classifier
    pub classifier: Arc<HoneypotClassifier>,
}

/// Build the operation router with CORS and trace layers applied
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/session/create", post(create_session))
        .route("/api/session/validate", post(validate_session))
        .route("/api/session/extend", post(extend_session))
        .route("/api/session/delete", post(delete_session))
        .route("/api/session/detect-honeypot", post(detect_honeypot))
        .route("/api/cleanup", post(cleanup))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// =============================================================================
// Request / response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    session_id: String,
    host_fingerprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdRequest {
    session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtendResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimpleResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    accessor_fingerprint: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectResponse {
    is_honeypot: bool,
    trap_type: TrapType,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_count: Option<u64>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> Response {
    let failure = |status: StatusCode, error: &str| {
        (
            status,
            Json(CreateResponse {
                success: false,
                session_id: None,
                expires_at: None,
                error: Some(error.to_string()),
            }),
        )
            .into_response()
    };

    // Grammar is re-validated here no matter what the client checked
    let id = match SessionId::parse(&body.session_id) {
        Ok(id) => id,
        Err(_) => return failure(StatusCode::BAD_REQUEST, "Invalid session format"),
    };
    let fingerprint = match Fingerprint::parse(&body.host_fingerprint) {
        Ok(fp) => fp,
        Err(_) => return failure(StatusCode::BAD_REQUEST, "Invalid session format"),
    };

    // The creator fingerprint is the origin identifier; network identity
    // is out of scope behind the anonymizing transport
    match state
        .limiter
        .admit(fingerprint.as_str(), ACTION_CREATE_SESSION)
        .await
    {
        Ok(decision) if !decision.allowed => {
            warn!("session creation rate limited");
            return failure(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
        }
        Ok(_) => {}
        Err(err) => {
            error!(%err, "rate limiter store failure");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
        }
    }

    match state.registry.create(&id, &fingerprint).await {
        Ok(record) => (
            StatusCode::OK,
            Json(CreateResponse {
                success: true,
                session_id: Some(record.id.to_string()),
                expires_at: Some(record.expires_at_ms),
                error: None,
            }),
        )
            .into_response(),
        Err(GhostError::Conflict { .. }) => {
            failure(StatusCode::CONFLICT, "Session already exists")
        }
        Err(err) => {
            error!(%err, "session creation failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

async fn validate_session(
    State(state): State<AppState>,
    Json(body): Json<SessionIdRequest>,
) -> Response {
    // Malformed, absent, and expired all produce the same 200 shape;
    // only an internal store failure changes the status code
    match state.registry.validate(&body.session_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ValidateResponse {
                valid: outcome.valid,
                expires_at: outcome.expires_at_ms,
            }),
        )
            .into_response(),
        Err(err) => {
            error!(%err, "session validation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ValidateResponse {
                    valid: false,
                    expires_at: None,
                }),
            )
                .into_response()
        }
    }
}

async fn extend_session(
    State(state): State<AppState>,
    Json(body): Json<SessionIdRequest>,
) -> Response {
    let failure = |status: StatusCode| {
        (
            status,
            Json(ExtendResponse {
                success: false,
                expires_at: None,
                error: Some("Unable to extend session".to_string()),
            }),
        )
            .into_response()
    };

    let id = match SessionId::parse(&body.session_id) {
        Ok(id) => id,
        Err(_) => return failure(StatusCode::BAD_REQUEST),
    };

    match state.registry.extend(&id).await {
        Ok(expires_at) => (
            StatusCode::OK,
            Json(ExtendResponse {
                success: true,
                expires_at: Some(expires_at),
                error: None,
            }),
        )
            .into_response(),
        Err(GhostError::NotFound { .. }) => failure(StatusCode::NOT_FOUND),
        Err(err) => {
            error!(%err, "session extension failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn delete_session(
    State(state): State<AppState>,
    Json(body): Json<SessionIdRequest>,
) -> Response {
    let id = match SessionId::parse(&body.session_id) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SimpleResponse {
                    success: false,
                    error: Some("Invalid session format".to_string()),
                }),
            )
                .into_response()
        }
    };

    match state.registry.delete(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(SimpleResponse {
                success: true,
                error: None,
            }),
        )
            .into_response(),
        Err(err) => {
            error!(%err, "session deletion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SimpleResponse {
                    success: false,
                    error: Some("Internal error".to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn detect_honeypot(
    State(state): State<AppState>,
    Json(body): Json<DetectRequest>,
) -> Response {
    let id_text = match body.session_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SimpleResponse {
                    success: false,
                    error: Some("Session ID required".to_string()),
                }),
            )
                .into_response()
        }
    };

    // An unparseable accessor fingerprint is treated as absent rather
    // than failing the probe check
    let accessor = body
        .accessor_fingerprint
        .as_deref()
        .and_then(|text| Fingerprint::parse(text).ok());

    match state.classifier.classify(id_text, accessor.as_ref()).await {
        Ok(result) => (
            StatusCode::OK,
            Json(DetectResponse {
                is_honeypot: result.is_trap,
                trap_type: result.trap_type,
                message: if result.session_found {
                    "Session found"
                } else {
                    "Session not found"
                },
            }),
        )
            .into_response(),
        Err(GhostError::InvalidFormat { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(SimpleResponse {
                success: false,
                error: Some("Invalid session format".to_string()),
            }),
        )
            .into_response(),
        Err(err) => {
            error!(%err, "honeypot classification failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SimpleResponse {
                    success: false,
                    error: Some("Internal error".to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn cleanup(State(state): State<AppState>) -> Response {
    let sessions = match state.registry.sweep().await {
        Ok(count) => count,
        Err(err) => {
            error!(%err, "session sweep failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CleanupResponse {
                    success: false,
                    deleted_count: None,
                }),
            )
                .into_response();
        }
    };

    // Bucket pruning rides on the same schedule; its count is not part
    // of the response contract
    if let Err(err) = state.limiter.prune().await {
        warn!(%err, "bucket prune failed");
    }

    (
        StatusCode::OK,
        Json(CleanupResponse {
            success: true,
            deleted_count: Some(sessions),
        }),
    )
        .into_response()
}
