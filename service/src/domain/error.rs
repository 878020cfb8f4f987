use thiserror::Error;

use crate::domain::repository::RepositoryError;

/// Rejected input, reported to the caller as 400 with the display message
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid {field}: expected one of {}", allowed.join(", "))]
    InvalidEnum {
        field: String,
        allowed: &'static [&'static str],
    },
    #[error("invalid {field}: expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
    #[error("unknown field {0}")]
    UnknownField(String),
    #[error("at least one {0} author is required")]
    EmptyAuthors(&'static str),
    #[error("one or more {0} authors are invalid")]
    InvalidAuthorReference(&'static str),
    #[error("{field} '{value}' already exists")]
    DuplicateKey { field: String, value: String },
    #[error("invalid filter {parameter}: {reason}")]
    InvalidFilter { parameter: String, reason: String },
    #[error("cannot sort by {0}")]
    InvalidSort(String),
    #[error("invalid {0}: expected a positive integer")]
    InvalidPagination(&'static str),
    #[error("ids must be a non-empty list")]
    EmptyIdList,
    #[error("request body must be a JSON object")]
    InvalidBody,
}

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for ResearchError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => ResearchError::NotFound("record".to_string()),
            RepositoryError::ValidationFailed(cause) => {
                ResearchError::Validation(ValidationError::InvalidFilter {
                    parameter: "request".to_string(),
                    reason: cause,
                })
            }
            RepositoryError::UniqueViolation { field, value } => {
                ResearchError::Validation(ValidationError::DuplicateKey { field, value })
            }
            RepositoryError::DatabaseError(cause) => {
                tracing::error!("{}", cause);
                ResearchError::Internal("Database server error".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use registry_common::domain::enums;

    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let error = ValidationError::InvalidEnum {
            field: "scope".into(),
            allowed: enums::JOURNAL_SCOPE,
        };
        assert_eq!(
            error.to_string(),
            "invalid scope: expected one of NATIONAL, INTERNATIONAL"
        );
        assert_eq!(
            ValidationError::MissingField("serialNo").to_string(),
            "serialNo is required"
        );
    }

    #[test]
    fn store_unique_violation_becomes_duplicate_key() {
        let error = ResearchError::from(RepositoryError::UniqueViolation {
            field: "serialNo".into(),
            value: "J-1".into(),
        });
        assert!(matches!(
            error,
            ResearchError::Validation(ValidationError::DuplicateKey { .. })
        ));
        assert_eq!(error.to_string(), "serialNo 'J-1' already exists");
    }
}
