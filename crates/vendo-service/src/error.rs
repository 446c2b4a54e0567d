//! # Service Error Type
//!
//! Unified error returned by the cart and sale workflows.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Vendo                                  │
//! │                                                                         │
//! │  Workflow step                          ServiceError      ErrorCode     │
//! │  ─────────────                          ────────────      ─────────     │
//! │                                                                         │
//! │  validate ids / quantity ── ValidationError ─► Validation   400        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  lookup returns None ─────────────────────► NotFound        404        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  aggregate rejects ────── CoreError ──────► BusinessRule    422        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  port write fails ─────── StoreError                                    │
//! │         ├── Conflict ─────────────────────► Conflict        409        │
//! │         └── Failure ──────────────────────► Store           500        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The request layer sitting on top of this crate receives an
//! [`ErrorResponse`]:
//! ```json
//! {
//!   "code": "BUSINESS_RULE",
//!   "message": "Quantity 21 exceeds maximum allowed (20)"
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

use vendo_core::{CoreError, ValidationError};

use crate::ports::StoreError;

/// Errors surfaced by the workflows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Malformed input. Nothing was read or written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The aggregate refused the operation.
    #[error("{0}")]
    BusinessRule(CoreError),

    /// Storage rejected a write because of a concurrent change.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unexpected persistence or collaborator failure.
    #[error("Internal error: {0}")]
    Store(String),
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Business rule violated (422)
    BusinessRule,

    /// Concurrent modification (409)
    Conflict,

    /// Internal error (500)
    Internal,
}

impl ErrorCode {
    /// HTTP-style status for the request layer.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::BusinessRule => 422,
            ErrorCode::Conflict => 409,
            ErrorCode::Internal => 500,
        }
    }
}

/// Serializable error body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::BusinessRule(_) => ErrorCode::BusinessRule,
            ServiceError::Conflict(_) => ErrorCode::Conflict,
            ServiceError::Store(_) => ErrorCode::Internal,
        }
    }

    /// Body for the request layer. Internal details stay in the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            ServiceError::Store(_) => "Operation failed, please retry".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            code: self.code(),
            message,
        }
    }
}

/// Core errors: missing child entities become `NotFound`, wrapped
/// validation stays validation, everything else is a business rule.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CartItemNotFound { product_id, .. } => {
                ServiceError::not_found("Cart item", product_id)
            }
            CoreError::SaleItemNotFound { item_id, .. } => {
                ServiceError::not_found("Sale item", item_id)
            }
            CoreError::Validation(e) => ServiceError::Validation(e),
            other => ServiceError::BusinessRule(other),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Conflict(message) => ServiceError::Conflict(message),
            StoreError::Failure(message) => {
                tracing::error!(error = %message, "Store operation failed");
                ServiceError::Store(message)
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
