//! Error types for the M-Pesa client.
//!
//! # Design
//! Callers see a single error type whose `Display` is exactly the
//! human-readable message, including server-supplied text such as
//! `"Invalid Amount"`. The variant records which stage failed
//! (configuration, argument validation, token acquisition, or the business
//! request) for callers that want to branch on it.

use thiserror::Error;

/// Errors returned by `MpesaClient` and its helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MpesaError {
    /// Missing configuration, or the certificate could not be loaded or used.
    #[error("{0}")]
    Config(String),

    /// A required call argument was missing. Raised before any I/O.
    #[error("{0}")]
    Validation(String),

    /// The OAuth token endpoint failed.
    #[error("{0}")]
    Auth(String),

    /// The business endpoint failed or returned a non-success response.
    #[error("{0}")]
    Request(String),
}

/// Stage at which an `MpesaError` was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Validation,
    Auth,
    Request,
}

impl MpesaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MpesaError::Config(_) => ErrorKind::Config,
            MpesaError::Validation(_) => ErrorKind::Validation,
            MpesaError::Auth(_) => ErrorKind::Auth,
            MpesaError::Request(_) => ErrorKind::Request,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            MpesaError::Config(msg)
            | MpesaError::Validation(msg)
            | MpesaError::Auth(msg)
            | MpesaError::Request(msg) => msg,
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        MpesaError::Validation(format!("{field} is required"))
    }
}

/// A network-level failure reported by an `HttpTransport`.
///
/// HTTP error statuses are not transport errors; they come back as
/// `HttpResponse` values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);
