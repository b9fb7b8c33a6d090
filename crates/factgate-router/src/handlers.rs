//! HTTP request handlers for the fact service.
//!
//! Implements fact submission, the contributor summary, attestation
//! re-issue and health check endpoints using axum.

use crate::FactCoordinator;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use factgate_domain::{Attestation, RecordId, Rejection, SubmissionOutcome, SubmissionRequest};
use factgate_gatekeeper::GatekeeperError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Submission coordinator
    pub coordinator: Arc<FactCoordinator>,
}

/// Fact submission request
///
/// Field names follow the wallet front end. Every field is optional so a
/// missing one is reported as a rejection rather than a parse failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SubmitFactRequest {
    /// Submitter's wallet address
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// The fact
    #[serde(default)]
    pub statement: Option<String>,
    /// Ownership proof signature
    #[serde(default)]
    pub signature: Option<String>,
    /// Unix seconds the proof was signed at, as a number or a string
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    /// Captcha token
    #[serde(default)]
    pub captcha_token: Option<String>,
}

impl From<SubmitFactRequest> for SubmissionRequest {
    fn from(request: SubmitFactRequest) -> Self {
        let proof_timestamp = request.timestamp.and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text),
            other => Some(other.to_string()),
        });

        SubmissionRequest {
            identity: request.wallet_address,
            statement: request.statement,
            ownership_proof: request.signature,
            proof_timestamp,
            abuse_check_token: request.captcha_token,
        }
    }
}

/// Fact submission response
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitFactResponse {
    /// The fact was recorded and attested
    Accepted {
        /// Record id (the token id to mint)
        record_id: u64,
        /// Submitter
        wallet_address: String,
        /// Attestation signature, `0x`-prefixed hex
        signature: String,
    },
    /// The fact was turned away
    Rejected {
        /// Machine-readable reason
        reason: String,
        /// Human-readable reason
        message: String,
        /// When the submitter may try again (rate limiting only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
}

/// Attestation response
#[derive(Debug, Serialize, Deserialize)]
pub struct AttestationResponse {
    /// Record id
    pub record_id: u64,
    /// Submitter
    pub wallet_address: String,
    /// Attestation signature, `0x`-prefixed hex
    pub signature: String,
}

impl From<Attestation> for AttestationResponse {
    fn from(attestation: Attestation) -> Self {
        Self {
            record_id: attestation.record_id.value(),
            wallet_address: attestation.identity.to_string(),
            signature: attestation.signature.to_hex(),
        }
    }
}

/// One contributor in the summary
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Contributor
    pub wallet_address: String,
    /// Number of accepted facts
    pub row_count: u64,
    /// Sum of their record ids
    pub id_sum: u64,
}

/// Contributor summary response
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Contributors, highest id sum first
    pub summary: Vec<SummaryRow>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Number of accepted facts
    pub fact_count: u64,
    /// Address attestations are signed by
    pub signer: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Response for a fact that was recorded but not signed
#[derive(Debug, Serialize, Deserialize)]
pub struct UnattestedResponse {
    /// Always "unattested"
    pub status: String,
    /// The recorded fact; retry via its attestation endpoint
    pub record_id: u64,
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Coordinator error
    Gatekeeper(GatekeeperError),
}

impl From<GatekeeperError> for AppError {
    fn from(e: GatekeeperError) -> Self {
        AppError::Gatekeeper(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Gatekeeper(e) = self;
        error!("Request failed: {}", e);

        let status = match &e {
            GatekeeperError::Unattested { record_id, .. } => {
                let body = Json(UnattestedResponse {
                    status: "unattested".to_string(),
                    record_id: record_id.value(),
                    error: e.to_string(),
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
            GatekeeperError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            GatekeeperError::AbuseCheckUnavailable(_) | GatekeeperError::Judge(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatekeeperError::Store(_) | GatekeeperError::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: e.to_string(),
        });
        (status, body).into_response()
    }
}

/// HTTP status for a rejection
pub fn rejection_status(rejection: &Rejection) -> StatusCode {
    match rejection {
        Rejection::Busy => StatusCode::SERVICE_UNAVAILABLE,
        Rejection::MissingFields | Rejection::InvalidProof | Rejection::AbuseCheckFailed => {
            StatusCode::BAD_REQUEST
        }
        Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        Rejection::NotUniqueOrInaccurate => StatusCode::OK,
    }
}

/// POST /api/fact - Submit a fact
async fn submit_fact(
    State(state): State<AppState>,
    Json(request): Json<SubmitFactRequest>,
) -> Result<(StatusCode, Json<SubmitFactResponse>), AppError> {
    let request = SubmissionRequest::from(request);
    let outcome = state.coordinator.submit(&request).await?;

    let response = match outcome {
        SubmissionOutcome::Accepted(attestation) => (
            StatusCode::OK,
            Json(SubmitFactResponse::Accepted {
                record_id: attestation.record_id.value(),
                wallet_address: attestation.identity.to_string(),
                signature: attestation.signature.to_hex(),
            }),
        ),
        SubmissionOutcome::Rejected(rejection) => (
            rejection_status(&rejection),
            Json(SubmitFactResponse::Rejected {
                reason: rejection.code().to_string(),
                message: rejection.to_string(),
                retry_after: rejection.retry_after(),
            }),
        ),
    };

    Ok(response)
}

/// GET /api/fact - Per-contributor summary
async fn fact_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state
        .coordinator
        .leaderboard()?
        .into_iter()
        .map(|entry| SummaryRow {
            wallet_address: entry.identity.to_string(),
            row_count: entry.fact_count,
            id_sum: entry.id_sum,
        })
        .collect();

    Ok(Json(SummaryResponse { summary }))
}

/// POST /api/fact/:record_id/attestation - Re-issue an attestation
async fn reissue_attestation(
    State(state): State<AppState>,
    Path(record_id): Path<u64>,
) -> Result<Json<AttestationResponse>, AppError> {
    let attestation = state.coordinator.attest(RecordId::from_value(record_id))?;
    Ok(Json(attestation.into()))
}

/// GET /health - Health check
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let (status, fact_count) = match state.coordinator.fact_count() {
        Ok(count) => ("healthy", count),
        Err(_) => ("unhealthy", 0),
    };

    Json(HealthCheckResponse {
        status: status.to_string(),
        fact_count,
        signer: state.coordinator.signer_address().to_string(),
    })
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/api/fact", post(submit_fact).get(fact_summary))
        .route("/api/fact/:record_id/attestation", post(reissue_attestation))
        .route("/health", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_coordinator, config::RouterConfig};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt; // for oneshot

    fn create_test_state() -> AppState {
        let coordinator = build_coordinator(&RouterConfig::default_test_config()).unwrap();
        AppState {
            coordinator: Arc::new(coordinator),
        }
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(rejection_status(&Rejection::Busy), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejection_status(&Rejection::MissingFields), StatusCode::BAD_REQUEST);
        assert_eq!(rejection_status(&Rejection::InvalidProof), StatusCode::BAD_REQUEST);
        assert_eq!(rejection_status(&Rejection::AbuseCheckFailed), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection_status(&Rejection::RateLimited { retry_after: 1 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(rejection_status(&Rejection::NotUniqueOrInaccurate), StatusCode::OK);
    }

    #[test]
    fn test_timestamp_number_or_string() {
        let numeric: SubmitFactRequest = serde_json::from_str(r#"{"timestamp": 1700000000}"#).unwrap();
        let text: SubmitFactRequest = serde_json::from_str(r#"{"timestamp": "1700000000"}"#).unwrap();
        let absent: SubmitFactRequest = serde_json::from_str(r#"{"timestamp": null}"#).unwrap();

        assert_eq!(
            SubmissionRequest::from(numeric).proof_timestamp.as_deref(),
            Some("1700000000")
        );
        assert_eq!(
            SubmissionRequest::from(text).proof_timestamp.as_deref(),
            Some("1700000000")
        );
        assert_eq!(SubmissionRequest::from(absent).proof_timestamp, None);
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_missing_fields() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/api/fact")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"statement": "Scroll is a zkEVM."}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unattested_error_response() {
        let error = AppError::Gatekeeper(GatekeeperError::Unattested {
            record_id: RecordId::from_value(17),
            identity: factgate_domain::Address::from_bytes([0x11; 20]),
            reason: "signing backend offline".to_string(),
        });

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: UnattestedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "unattested");
        assert_eq!(body.record_id, 17);
        assert!(body.error.contains("signing backend offline"));
    }

    #[tokio::test]
    async fn test_reissue_unknown_record() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/api/fact/42/attestation")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
