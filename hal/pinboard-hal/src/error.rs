//! Platform error types
//!
//! Every driver trait reports operational failures through [`HalError`].
//! Contract violations (wrong pin for a capability) are not errors; they
//! are caught before any driver call is made.

use core::fmt;

/// Result type for driver operations
pub type Result<T> = core::result::Result<T, HalError>;

/// Platform-level errors
///
/// Backends map their SDK status codes onto these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// Argument rejected by the platform (bad pin mask, bad channel)
    InvalidArg,
    /// Operation not valid in the current state (already installed, not initialised)
    InvalidState,
    /// Operation timed out
    Timeout,
    /// Resource in use by another peripheral (ADC2 vs. radio)
    Busy,
    /// Requested item does not exist
    NotFound,
    /// Every requested converter sample failed
    NoValidSample,
    /// Unspecified platform failure
    Fail,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            HalError::InvalidArg => "invalid argument",
            HalError::InvalidState => "invalid state",
            HalError::Timeout => "timed out",
            HalError::Busy => "resource busy",
            HalError::NotFound => "not found",
            HalError::NoValidSample => "no valid converter sample",
            HalError::Fail => "platform failure",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::digital::Error for HalError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}
