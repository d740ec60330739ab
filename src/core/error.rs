//! Error taxonomy for the drafting pipeline.
//!
//! Provider and backend failures are converted into one of these
//! kinds at the pipeline boundary so the HTTP layer (and anything
//! else calling the pipeline) can branch on `kind()` instead of
//! parsing messages.

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing request data. Client-correctable.
    #[error("{0}")]
    Validation(String),

    /// No valid session for the request.
    #[error("{0}")]
    Unauthenticated(String),

    /// Unknown user, thread or record.
    #[error("{0}")]
    NotFound(String),

    /// The provider rejected the stored credential. The inner detail
    /// is only logged.
    #[error("Your authentication token has expired. Please log in again to continue.")]
    AuthExpired(String),

    #[error("Unable to complete the request due to permission or quota restrictions: {0}")]
    QuotaOrPermission(String),

    #[error(
        "Failed to send email after {attempts} attempts. Please try again later. Last error: {last_error}"
    )]
    DispatchExhausted { attempts: usize, last_error: String },

    #[error("Draft generation failed: {0}")]
    Generation(String),

    /// A provider call failed outside of dispatch.
    #[error("Mail provider request failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Unauthenticated(_) => "unauthenticated",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::AuthExpired(_) => "auth_expired",
            PipelineError::QuotaOrPermission(_) => "quota_or_permission",
            PipelineError::DispatchExhausted { .. } => "dispatch_exhausted",
            PipelineError::Generation(_) => "generation_error",
            PipelineError::Upstream(_) => "upstream_error",
            PipelineError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Unauthenticated(_) | PipelineError::AuthExpired(_) => {
                StatusCode::UNAUTHORIZED
            }
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::QuotaOrPermission(_) => StatusCode::FORBIDDEN,
            PipelineError::Generation(_) | PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::DispatchExhausted { .. } | PipelineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to show to the caller.
    pub fn detail(&self) -> String {
        match self {
            PipelineError::Internal(_) => String::from("Something went wrong"),
            other => other.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error> for PipelineError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        PipelineError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_expired_hides_detail() {
        let err = PipelineError::AuthExpired("invalid_grant: token revoked".to_string());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(err.detail().contains("log in again"));
        assert!(!err.detail().contains("invalid_grant"));
    }

    #[test]
    fn test_internal_detail_is_generic() {
        let err = PipelineError::from(anyhow::anyhow!("db file locked at /var/lib/x"));
        assert_eq!(err.kind(), "internal_error");
        assert_eq!(err.detail(), "Something went wrong");
    }

    #[test]
    fn test_dispatch_exhausted_carries_last_error() {
        let err = PipelineError::DispatchExhausted {
            attempts: 3,
            last_error: "503 backend unavailable".to_string(),
        };
        assert_eq!(err.kind(), "dispatch_exhausted");
        assert!(err.detail().contains("after 3 attempts"));
        assert!(err.detail().contains("503 backend unavailable"));
    }
}
