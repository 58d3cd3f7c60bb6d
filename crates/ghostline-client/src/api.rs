//! Typed client for the server's session operations
//!
//! Grammar is validated client-side before any request is issued, as a
//! fast-fail guard; the server re-validates identically, so bypassing
//! this wrapper changes nothing. Error handling is availability-biased
//! where the spec calls for it: a session validation or deletion that
//! cannot reach the server is treated as valid / succeeded rather than
//! surfacing a false "session expired" to the user — TTL expiry is the
//! eventual backstop.

use ghostline_core::{Fingerprint, GhostError, Result, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

/// Result of a successful session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedSession {
    /// Absolute expiry, epoch milliseconds
    pub expires_at_ms: u64,
}

/// Client-side view of a validation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationView {
    /// Whether the session should be treated as live
    pub valid: bool,
    /// Expiry when the server reported one
    pub expires_at_ms: Option<u64>,
    /// True when validity was assumed because the server was unreachable
    pub assumed: bool,
}

/// Trap verdict for a prospective join
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrapVerdict {
    /// Whether the identifier is trap or probe bait
    pub is_honeypot: bool,
    /// Wire trap type: `explicit_trap`, `dead_session`, or `none`
    pub trap_type: String,
    /// Generic found/not-found message
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDto {
    success: bool,
    #[serde(default)]
    expires_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateDto {
    valid: bool,
    #[serde(default)]
    expires_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtendDto {
    success: bool,
    #[serde(default)]
    expires_at: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdBody<'a> {
    session_id: &'a str,
}

/// HTTP wrapper over the six server operations
pub struct SessionApi {
    base_url: String,
    http: reqwest::Client,
}

impl SessionApi {
    /// Create a client for the server at `base_url` (no trailing slash)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, op: &str) -> String {
        format!("{}/api/{}", self.base_url, op)
    }

    /// Create a session for the given identifier and host fingerprint
    pub async fn create(
        &self,
        id: &SessionId,
        fingerprint: &Fingerprint,
    ) -> Result<CreatedSession> {
        let response = self
            .http
            .post(self.url("session/create"))
            .json(&json!({
                "sessionId": id.as_str(),
                "hostFingerprint": fingerprint.as_str(),
            }))
            .send()
            .await
            .map_err(|e| GhostError::unreachable(format!("create request failed: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let dto: CreateDto = response
                    .json()
                    .await
                    .map_err(|e| GhostError::internal(format!("malformed create response: {e}")))?;
                match (dto.success, dto.expires_at) {
                    (true, Some(expires_at_ms)) => Ok(CreatedSession { expires_at_ms }),
                    _ => Err(GhostError::internal("incomplete create response")),
                }
            }
            400 => Err(GhostError::invalid_format("session rejected as malformed")),
            409 => Err(GhostError::conflict("session id already exists")),
            429 => Err(GhostError::rate_limited("session creation rate limited")),
            _ => Err(GhostError::internal("session creation failed")),
        }
    }

    /// Validate an identifier as typed or pasted by the user.
    ///
    /// Malformed input fails fast without a request. An unreachable
    /// server yields an assumed-valid view, never a false expiry.
    pub async fn validate(&self, id_text: &str) -> ValidationView {
        if SessionId::parse(id_text).is_err() {
            return ValidationView {
                valid: false,
                expires_at_ms: None,
                assumed: false,
            };
        }

        let response = self
            .http
            .post(self.url("session/validate"))
            .json(&SessionIdBody {
                session_id: id_text,
            })
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "validation unreachable; assuming session is valid");
                return ValidationView {
                    valid: true,
                    expires_at_ms: None,
                    assumed: true,
                };
            }
        };

        match response.json::<ValidateDto>().await {
            Ok(dto) => ValidationView {
                valid: dto.valid,
                expires_at_ms: dto.expires_at,
                assumed: false,
            },
            Err(err) => {
                warn!(%err, "unreadable validation response; assuming session is valid");
                ValidationView {
                    valid: true,
                    expires_at_ms: None,
                    assumed: true,
                }
            }
        }
    }

    /// Flat-reset the session's expiry
    pub async fn extend(&self, id: &SessionId) -> Result<u64> {
        let response = self
            .http
            .post(self.url("session/extend"))
            .json(&SessionIdBody {
                session_id: id.as_str(),
            })
            .send()
            .await
            .map_err(|e| GhostError::unreachable(format!("extend request failed: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let dto: ExtendDto = response
                    .json()
                    .await
                    .map_err(|e| GhostError::internal(format!("malformed extend response: {e}")))?;
                match (dto.success, dto.expires_at) {
                    (true, Some(expires_at_ms)) => Ok(expires_at_ms),
                    _ => Err(GhostError::internal("incomplete extend response")),
                }
            }
            404 => Err(GhostError::not_found("no active session to extend")),
            400 => Err(GhostError::invalid_format("session rejected as malformed")),
            _ => Err(GhostError::internal("session extension failed")),
        }
    }

    /// Delete the session.
    ///
    /// A deletion that cannot confirm completion is still treated as
    /// locally successful; TTL expiry removes the row eventually.
    pub async fn delete(&self, id: &SessionId) -> Result<()> {
        let result = self
            .http
            .post(self.url("session/delete"))
            .json(&SessionIdBody {
                session_id: id.as_str(),
            })
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(%err, "deletion unreachable; treating as locally successful");
                Ok(())
            }
        }
    }

    /// Tear a session down end to end: scrub the local message buffer
    /// first, then delete the server-side record.
    ///
    /// Local erasure is unconditional and completes before the network
    /// is touched; the server delete inherits the availability bias of
    /// [`delete`](Self::delete).
    pub async fn teardown(
        &self,
        store: &crate::message_store::EphemeralMessageStore,
        id: &SessionId,
    ) -> Result<()> {
        store.destroy_session(id);
        self.delete(id).await
    }

    /// Vet an identifier for trap or probe signatures before joining.
    ///
    /// Takes raw text, not a parsed id: honeytokens do not match the
    /// session grammar and must reach the classifier verbatim.
    pub async fn detect_honeypot(
        &self,
        id_text: &str,
        accessor: Option<&Fingerprint>,
    ) -> Result<TrapVerdict> {
        if id_text.is_empty() {
            return Err(GhostError::invalid_format("session id required"));
        }

        let mut body = json!({ "sessionId": id_text });
        if let Some(fingerprint) = accessor {
            body["accessorFingerprint"] = json!(fingerprint.as_str());
        }

        let response = self
            .http
            .post(self.url("session/detect-honeypot"))
            .json(&body)
            .send()
            .await
            .map_err(|e| GhostError::unreachable(format!("detection request failed: {e}")))?;

        match response.status().as_u16() {
            200 => response
                .json::<TrapVerdict>()
                .await
                .map_err(|e| GhostError::internal(format!("malformed detection response: {e}"))),
            400 => Err(GhostError::invalid_format("session rejected as malformed")),
            _ => Err(GhostError::internal("honeypot detection failed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // The guard paths must fail before any connection is attempted, so an
    // unroutable base URL distinguishes fast-fail from a network error.
    fn unroutable_api() -> SessionApi {
        SessionApi::new("http://127.0.0.1:1")
    }

    #[tokio::test]
    async fn malformed_id_fails_validation_without_a_request() {
        let api = unroutable_api();
        let view = api.validate("not-a-session-id").await;
        assert!(!view.valid);
        assert!(!view.assumed);
    }

    #[tokio::test]
    async fn unreachable_validation_assumes_the_session_is_valid() {
        let api = unroutable_api();
        let view = api.validate("GHOST-ABCD-2345").await;
        assert!(view.valid);
        assert!(view.assumed);
    }

    #[tokio::test]
    async fn unreachable_deletion_is_treated_as_success() {
        let api = unroutable_api();
        let id = SessionId::parse("GHOST-ABCD-2345").unwrap();
        assert!(api.delete(&id).await.is_ok());
    }

    #[tokio::test]
    async fn teardown_scrubs_locally_even_when_the_server_is_unreachable() {
        use crate::message_store::{
            EphemeralMessageStore, MessageId, MessageKind, QueuedMessage, SenderRole,
        };

        let api = unroutable_api();
        let id = SessionId::parse("GHOST-ABCD-2345").unwrap();
        let store = EphemeralMessageStore::new();
        store.add(
            &id,
            QueuedMessage {
                id: MessageId::new(),
                content: "sensitive".to_string(),
                sender: SenderRole::Local,
                kind: MessageKind::Text,
                sent_at_ms: 1,
                received_at_ms: 1,
                acknowledged: false,
                filename: None,
            },
        );

        assert!(api.teardown(&store, &id).await.is_ok());
        assert_eq!(store.message_count(&id), 0);
    }

    #[tokio::test]
    async fn empty_detection_id_fails_before_any_request() {
        let api = unroutable_api();
        let err = api.detect_honeypot("", None).await.unwrap_err();
        assert_matches!(err, GhostError::InvalidFormat { .. });
    }

    #[tokio::test]
    async fn unreachable_creation_surfaces_unreachable() {
        let api = unroutable_api();
        let id = SessionId::parse("GHOST-ABCD-2345").unwrap();
        let fp = Fingerprint::parse("host-fingerprint-01").unwrap();
        let err = api.create(&id, &fp).await.unwrap_err();
        assert_matches!(err, GhostError::Unreachable { .. });
    }
}
