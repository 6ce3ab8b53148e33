//! Host device error types

use thiserror::Error;

/// Errors raised while parsing host device values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostdevError {
    /// Id is not of the form `vendor:product`
    #[error("Invalid USB id '{0}', expected VENDOR:PRODUCT (e.g. '1d6b:0002')")]
    InvalidUsbId(String),

    /// One half of an id is not a 16-bit hex number
    #[error("Invalid {field} '{value}', must be 1-4 hex digits")]
    InvalidHex { field: &'static str, value: String },
}

/// Type alias for host device results
pub type Result<T> = std::result::Result<T, HostdevError>;
