use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForkError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Invalid fork reference: {0}")]
    InvalidReference(String),

    #[error("Resource {resource_id} is not part of revision {revision_id}")]
    ResourceNotInRevision {
        resource_id: String,
        revision_id: String,
    },

    #[error("Caller identity required: {0}")]
    MissingIdentity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForkError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ForkError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ForkError::NotFound(_) | ForkError::ResourceNotInRevision { .. }
        )
    }

    /// Error type label used in the action API envelope
    pub fn kind(&self) -> &'static str {
        match self {
            ForkError::NotFound(_) | ForkError::ResourceNotInRevision { .. } => "Not Found Error",
            ForkError::Unauthorized(_) => "Authorization Error",
            ForkError::Invalid { .. } | ForkError::InvalidReference(_) | ForkError::Json(_) => {
                "Validation Error"
            }
            ForkError::MissingIdentity(_) => "Authorization Error",
            ForkError::Config(_) | ForkError::Internal(_) | ForkError::Io(_) => "Internal Error",
        }
    }
}

impl IntoResponse for ForkError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ForkError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ForkError::ResourceNotInRevision { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            ForkError::Unauthorized(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ForkError::Invalid { .. } => (StatusCode::CONFLICT, self.to_string()),
            ForkError::InvalidReference(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ForkError::Json(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ForkError::MissingIdentity(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ForkError::Config(_) | ForkError::Internal(_) | ForkError::Io(_) => {
                tracing::error!("Action failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let mut error = json!({ "__type": self.kind(), "message": message });
        if let ForkError::Invalid { field, message } = &self {
            error[field.as_str()] = json!([message]);
        }

        (status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ForkError>;
