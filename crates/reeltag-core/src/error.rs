//! Error types for reeltag.

use thiserror::Error;

/// Result type alias using reeltag's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reeltag operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Video not found by its external platform id
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    /// Invalid input (failed validation before any mutation)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Forbidden (authenticated but not authorized for a planned mutation)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Search index propagation failed (logged/retried, never fatal to a call)
    #[error("Index sync error: {0}")]
    IndexSync(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// A failure wrapped with phase context (which reconciliation phase,
    /// which segment) so callers see more than a bare store error
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with phase/segment context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("segment abc".to_string());
        assert_eq!(err.to_string(), "Not found: segment abc");
    }

    #[test]
    fn test_error_display_video_not_found() {
        let err = Error::VideoNotFound("dQw4w9WgXcQ".to_string());
        assert_eq!(err.to_string(), "Video not found: dQw4w9WgXcQ");
    }

    #[test]
    fn test_error_display_forbidden() {
        let err = Error::Forbidden("not the segment owner".to_string());
        assert_eq!(err.to_string(), "Forbidden: not the segment owner");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("start must be before end".to_string());
        assert_eq!(err.to_string(), "Invalid input: start must be before end");
    }

    #[test]
    fn test_error_display_index_sync() {
        let err = Error::IndexSync("bulk request rejected".to_string());
        assert_eq!(err.to_string(), "Index sync error: bulk request rejected");
    }

    #[test]
    fn test_context_prefixes_and_keeps_source() {
        let err = Error::Database(sqlx::Error::RowNotFound).context("aggregate maintenance");
        assert_eq!(
            err.to_string(),
            "aggregate maintenance: Database error: no rows returned by a query that expected to return at least one row"
        );
        assert!(matches!(
            err,
            Error::Context { ref source, .. } if matches!(**source, Error::Database(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Internal(_)));
    }
}
