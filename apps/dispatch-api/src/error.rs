use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Routing / delivery errors
// ---------------------------------------------------------------------------

/// Failures of the bus-to-node delivery path. None of these are fatal: they
/// are logged and the affected message or node is dropped.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Empty or undecodable bus payload.
    #[error("malformed message on {topic}: {reason}")]
    MalformedMessage { topic: String, reason: String },
    /// No routing entry for the node, or the remote call failed or timed out.
    #[error("delivery node {node_id} unreachable: {reason}")]
    NodeUnreachable { node_id: String, reason: String },
}

impl RelayError {
    pub fn malformed(topic: &str, reason: impl ToString) -> Self {
        Self::MalformedMessage {
            topic: topic.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unreachable(node_id: &str, reason: impl ToString) -> Self {
        Self::NodeUnreachable {
            node_id: node_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP API errors
// ---------------------------------------------------------------------------

/// Structured API error returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR".to_string(),
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
