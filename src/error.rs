//! Error taxonomy module
//!
//! Every failure raised by a hook, a primary-key cast or an operation ends up
//! here. Typed failures carry their own status code and message list; anything
//! else is flattened to an opaque 500 so internals never leak to the client.

use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Message returned for every unclassified failure
pub const GENERIC_MESSAGE: &str = "Something went wrong";

/// Fixed reason text of a database connection failure
pub const DATABASE_CONNECTION_REASON: &str = "Error connecting to database";

/// One entry of an error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorEntry {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// Error response body: `{"errors": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub errors: Vec<ErrorEntry>,
}

/// Discriminant of a [`ServiceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthorised,
    NotFound,
    DatabaseConnection,
    RequestValidation,
    Unclassified,
}

/// Failure of a single request
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not authorised")]
    NotAuthorised,

    #[error("Route not found")]
    NotFound,

    #[error("Error connecting to database")]
    DatabaseConnection,

    #[error("Invalid parameters")]
    RequestValidation(Vec<ErrorEntry>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Wrap any error as an unclassified failure
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(anyhow::Error::new(err))
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotAuthorised => ErrorKind::NotAuthorised,
            Self::NotFound => ErrorKind::NotFound,
            Self::DatabaseConnection => ErrorKind::DatabaseConnection,
            Self::RequestValidation(_) => ErrorKind::RequestValidation,
            Self::Other(_) => ErrorKind::Unclassified,
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::BadRequest | ErrorKind::RequestValidation => StatusCode::BAD_REQUEST,
            ErrorKind::NotAuthorised => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DatabaseConnection | ErrorKind::Unclassified => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing entries; unclassified failures never expose their cause
    pub fn serialize_errors(&self) -> Vec<ErrorEntry> {
        match self {
            Self::BadRequest(message) => vec![ErrorEntry::message(message.clone())],
            Self::NotAuthorised => vec![ErrorEntry::message("Not authorised")],
            Self::NotFound => vec![ErrorEntry::message("Not Found")],
            Self::DatabaseConnection => vec![ErrorEntry::message(DATABASE_CONNECTION_REASON)],
            Self::RequestValidation(entries) => entries.clone(),
            Self::Other(_) => vec![ErrorEntry::message(GENERIC_MESSAGE)],
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            errors: self.serialize_errors(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_status_codes() {
        assert_eq!(
            ServiceError::bad_request("nope").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotAuthorised.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::DatabaseConnection.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::RequestValidation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_unclassified_hides_cause() {
        let err = ServiceError::Other(anyhow::anyhow!("connection string leaked"));
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            json!({ "errors": [{ "message": "Something went wrong" }] })
        );
    }

    #[test]
    fn test_validation_entries_keep_fields() {
        let err = ServiceError::RequestValidation(vec![
            ErrorEntry::field("Name is required", "name"),
            ErrorEntry::field("Invalid value", "age"),
        ]);
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            json!({ "errors": [
                { "message": "Name is required", "field": "name" },
                { "message": "Invalid value", "field": "age" },
            ]})
        );
    }

    #[test]
    fn test_fixed_messages() {
        assert_eq!(
            ServiceError::NotFound.serialize_errors(),
            vec![ErrorEntry::message("Not Found")]
        );
        assert_eq!(
            ServiceError::DatabaseConnection.serialize_errors(),
            vec![ErrorEntry::message("Error connecting to database")]
        );
        assert_eq!(
            ServiceError::bad_request("Missing title").serialize_errors(),
            vec![ErrorEntry::message("Missing title")]
        );
    }
}
