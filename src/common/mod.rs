// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod buffer;
pub mod command;
pub mod config;
pub mod error;
pub mod hal_traits;
pub mod timing;

// --- Re-export key types/traits/functions for easier access ---

// From buffer.rs
pub use buffer::{ReceiveBuffer, COMMAND_BUFFER_SIZE, PAYLOAD_BUFFER_SIZE};

// From command.rs
pub use command::{Arg, AtCommand, CommandBuilder, CommandFormatError, CommandLine};

// From config.rs
pub use config::{AggregatorConfig, LinkConfig, WeatherTarget};

// From error.rs
pub use error::WxError;

// From hal_traits.rs
pub use hal_traits::{
    DataLine, Direction, HalTimer, Level, MicrosCounter, OpenDrainLine, SerialChannel, Timer,
};

// From timing.rs (constants stay under common::timing::*)
pub use timing::{Instant, PollWindow};

/// Outcome of one command transaction.
///
/// Every transaction primitive returns one of these; the value alone decides
/// what the caller does next.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum CommandResult {
    /// The expected substring appeared before the timeout.
    Matched,
    /// The timeout elapsed first. Partial data stays in the buffer.
    TimedOut,
    /// Rejected before any I/O.
    InvalidArgument,
}

impl CommandResult {
    #[inline]
    pub fn is_matched(&self) -> bool {
        matches!(self, CommandResult::Matched)
    }

    /// Turns a non-match into an error for sequences that cannot continue.
    ///
    /// A timeout with nothing received is [`WxError::Timeout`]; one with
    /// partial data (usually an `ERROR` or `FAIL` line) is [`WxError::NoMatch`].
    pub fn require<E: core::fmt::Debug, const N: usize>(
        self,
        rx: &ReceiveBuffer<N>,
    ) -> Result<(), WxError<E>> {
        match self {
            CommandResult::Matched => Ok(()),
            CommandResult::InvalidArgument => Err(WxError::InvalidArgument),
            CommandResult::TimedOut if rx.is_empty() => Err(WxError::Timeout),
            CommandResult::TimedOut => Err(WxError::NoMatch),
        }
    }
}
