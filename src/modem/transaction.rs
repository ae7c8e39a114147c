// src/modem/transaction.rs

use super::AtModem;
use crate::common::{
    buffer::ReceiveBuffer,
    command::{AtCommand, CommandBuilder},
    error::WxError,
    hal_traits::{SerialChannel, Timer},
    timing::{self, PollWindow},
    CommandResult,
};
use core::time::Duration;
use log::{debug, trace, warn};

impl<IF> AtModem<IF>
where
    IF: SerialChannel + Timer,
{
    /// Sends `command` plus CRLF and waits for `expected` to appear in the reply.
    ///
    /// `rx` is cleared first and keeps whatever arrived, matched or not.
    /// Bytes beyond its capacity are dropped but still consumed from the line.
    ///
    /// An empty command or expected string, a zero timeout, or a command
    /// containing a line break is rejected with
    /// [`CommandResult::InvalidArgument`] before anything is written.
    ///
    /// # Errors
    ///
    /// Only a failed write is an `Err`. Read errors while waiting are logged
    /// and treated as line noise.
    pub fn send_and_wait<const N: usize>(
        &mut self,
        command: &str,
        expected: &str,
        timeout: Duration,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<CommandResult, WxError<IF::Error>> {
        if command.is_empty()
            || expected.is_empty()
            || timeout.is_zero()
            || command.bytes().any(|b| b == b'\r' || b == b'\n')
        {
            warn!(
                "at: rejected command {:?} expecting {:?} within {} ms",
                command,
                expected,
                timeout.as_millis()
            );
            return Ok(CommandResult::InvalidArgument);
        }

        rx.clear();
        debug!("at: >> {}", command);
        self.send_command_bytes(command.as_bytes())?;
        Ok(self.wait_for(expected.as_bytes(), timeout, rx))
    }

    /// Formats `command` and runs it through [`send_and_wait`](Self::send_and_wait).
    ///
    /// A template that fails to format yields [`CommandResult::InvalidArgument`]
    /// without any I/O.
    pub fn send_formatted_and_wait<const N: usize>(
        &mut self,
        command: &CommandBuilder<'_>,
        expected: &str,
        timeout: Duration,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<CommandResult, WxError<IF::Error>> {
        match command.build() {
            Ok(line) => self.send_and_wait(line.as_str(), expected, timeout, rx),
            Err(e) => {
                warn!("at: cannot format command: {}", e);
                Ok(CommandResult::InvalidArgument)
            }
        }
    }

    /// Runs a known command with its usual acknowledgement.
    pub fn send_command<const N: usize>(
        &mut self,
        command: &AtCommand<'_>,
        timeout: Duration,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<CommandResult, WxError<IF::Error>> {
        self.send_formatted_and_wait(&command.builder(), command.expected(), timeout, rx)
    }

    /// [`send_command`](Self::send_command) with the outcome turned into an error.
    pub fn run_command<const N: usize>(
        &mut self,
        command: &AtCommand<'_>,
        timeout: Duration,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<(), WxError<IF::Error>> {
        self.send_command(command, timeout, rx)?.require(rx)
    }

    /// Waits for `expected` without sending anything first. Clears `rx`.
    pub fn await_response<const N: usize>(
        &mut self,
        expected: &str,
        timeout: Duration,
        rx: &mut ReceiveBuffer<N>,
    ) -> CommandResult {
        if expected.is_empty() || timeout.is_zero() {
            return CommandResult::InvalidArgument;
        }
        rx.clear();
        self.wait_for(expected.as_bytes(), timeout, rx)
    }

    fn wait_for<const N: usize>(
        &mut self,
        expected: &[u8],
        timeout: Duration,
        rx: &mut ReceiveBuffer<N>,
    ) -> CommandResult {
        let start = self.interface.now();
        let mut window = PollWindow::new(start, timeout);
        // Bounds the loop even if the clock never advances; bytes don't count
        let mut idle = PollWindow::new(start, timeout).with_step(timing::SERIAL_IDLE_POLL);

        while let Some(elapsed) = window.poll(self.interface.now()) {
            let wait = self
                .config
                .command_byte_wait
                .min(timeout.saturating_sub(elapsed));

            let read = self.read_one(wait);
            if read.is_err() && idle.poll(self.interface.now()).is_none() {
                break;
            }
            match read {
                Ok(byte) => {
                    trace!("at: << {:#04x}", byte);
                    // Checked after every append, so a match always ends at the newest byte
                    if rx.push(byte) && rx.ends_with(expected) {
                        debug!(
                            "at: matched {:?} after {} bytes",
                            core::str::from_utf8(expected).unwrap_or("?"),
                            rx.len()
                        );
                        return CommandResult::Matched;
                    }
                }
                Err(WxError::Io(e)) => {
                    warn!("at: read error while waiting: {:?}", e);
                    self.interface
                        .delay_us(timing::SERIAL_IDLE_POLL.as_micros() as u32);
                }
                Err(_) => {} // per-byte wait ran out, check the window again
            }
        }

        if rx.is_empty() {
            warn!("at: no response within {} ms", timeout.as_millis());
        } else {
            warn!(
                "at: timed out after {} bytes ({} dropped): {:?}",
                rx.len(),
                rx.dropped(),
                rx.as_str_lossy()
            );
        }
        CommandResult::TimedOut
    }
}
