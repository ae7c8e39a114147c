// src/common/error.rs

use super::command::CommandFormatError;

/// Every failure the sensor decoder and the modem layers can report.
///
/// The variants stay distinct so a caller can apply its own retry policy
/// (re-read the sensor after the minimum spacing, re-join with a longer
/// timeout, ...). Nothing in this crate retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WxError<E = ()>
where
    E: core::fmt::Debug, // Still need Debug for the generic Io error
{
    /// Underlying I/O error from the HAL implementation.
    #[error("I/O error: {0:?}")] // Format string requires Debug on E
    Io(E),

    /// Malformed call, rejected before any I/O happened.
    #[error("Invalid argument")]
    InvalidArgument,

    /// No response or line-state change within the budget of a protocol phase.
    #[error("Operation timed out")]
    Timeout,

    /// Sensor frame integrity failure.
    #[error("Checksum mismatch: expected {expected:#04x}, calculated {calculated:#04x}")]
    ChecksumMismatch { expected: u8, calculated: u8 },

    /// Bytes arrived, but the expected substring never showed up.
    #[error("Expected response not observed")]
    NoMatch,

    /// A command line could not be composed from its template and arguments.
    #[error("Command formatting failed: {0}")]
    CommandFormat(CommandFormatError),
}

impl<E: core::fmt::Debug> From<CommandFormatError> for WxError<E> {
    fn from(e: CommandFormatError) -> Self {
        WxError::CommandFormat(e)
    }
}

impl<E: core::fmt::Debug> WxError<E> {
    /// True for failures a caller may reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WxError::Timeout | WxError::NoMatch | WxError::ChecksumMismatch { .. }
        )
    }
}

// HAL errors are wrapped with `map_err(WxError::Io)` at each call site.
