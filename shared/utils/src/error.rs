use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BomError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Referential violation: {message}")]
    ReferentialViolation { message: String },

    #[error("Adding part type {child} to part type {parent} would create a circular reference ({reason})")]
    CycleRejected { parent: i64, child: i64, reason: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BomError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn referential(message: impl Into<String>) -> Self {
        Self::ReferentialViolation {
            message: message.into(),
        }
    }

    pub fn cycle_rejected(parent: i64, child: i64, reason: impl Into<String>) -> Self {
        Self::CycleRejected {
            parent,
            child,
            reason: reason.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ReferentialViolation { .. } => "REFERENTIAL_VIOLATION",
            Self::CycleRejected { .. } => "CYCLE_REJECTED",
            Self::Conflict { .. } => "CONFLICT",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Database { .. } => 500,
            Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::ReferentialViolation { .. } => 409,
            Self::CycleRejected { .. } => 409,
            Self::Conflict { .. } => 409,
            Self::Configuration { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }

    pub fn is_cycle_rejection(&self) -> bool {
        matches!(self, Self::CycleRejected { .. })
    }
}

pub type BomResult<T> = Result<T, BomError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<BomError> for ErrorResponse {
    fn from(error: BomError) -> Self {
        let details = match &error {
            BomError::CycleRejected { parent, child, reason } => Some(serde_json::json!({
                "parent_part_type_id": parent,
                "child_part_type_id": child,
                "reason": reason,
            })),
            BomError::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

// Store constraint failures become ReferentialViolation, never a raw store error.
impl From<sqlx::Error> for BomError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::referential(format!(
                    "Referenced record does not exist ({})",
                    db_err.constraint().unwrap_or("foreign key")
                ))
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::referential(format!(
                    "Duplicate value violates {}",
                    db_err.constraint().unwrap_or("a unique constraint")
                ))
            }
            sqlx::Error::RowNotFound => Self::not_found("row"),
            _ => Self::database(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for BomError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<config::ConfigError> for BomError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}
