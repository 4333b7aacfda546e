//! Error types for ResolveIT domain values

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid grievance status: {0}")]
    InvalidStatus(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}
