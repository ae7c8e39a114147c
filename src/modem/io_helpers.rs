// src/modem/io_helpers.rs

use super::AtModem; // Access AtModem definition
use crate::common::{
    error::WxError,
    hal_traits::{SerialChannel, Timer},
    timing::{self, PollWindow},
};
use core::time::Duration;
use log::trace;
use nb::Result as NbResult;

// Implementation block for I/O related helpers
impl<IF> AtModem<IF>
where
    IF: SerialChannel + Timer,
{
    /// Executes a non-blocking I/O operation (`f`) repeatedly until it
    /// stops returning `WouldBlock`, returning the final result or a timeout error.
    pub(super) fn execute_blocking_io_with_timeout<FN, T>(
        &mut self,
        timeout: Duration,
        mut f: FN,
    ) -> Result<T, WxError<IF::Error>>
    where
        FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
    {
        let mut window = PollWindow::new(self.interface.now(), timeout)
            .with_step(timing::SERIAL_IDLE_POLL);

        while window.poll(self.interface.now()).is_some() {
            match f(&mut self.interface) {
                Ok(result) => return Ok(result),
                Err(nb::Error::WouldBlock) => {
                    self.interface
                        .delay_us(timing::SERIAL_IDLE_POLL.as_micros() as u32);
                }
                Err(nb::Error::Other(e)) => return Err(WxError::Io(e)),
            }
        }
        Err(WxError::Timeout)
    }

    /// Waits up to `wait` for one received byte.
    pub fn read_one(&mut self, wait: Duration) -> Result<u8, WxError<IF::Error>> {
        self.execute_blocking_io_with_timeout(wait, |iface| iface.read_byte())
    }

    /// Writes `bytes` and flushes; each byte gets `timeout` to be accepted.
    pub(super) fn send_bytes(
        &mut self,
        bytes: &[u8],
        timeout: Duration,
    ) -> Result<(), WxError<IF::Error>> {
        self.write_all(bytes, timeout)?;
        self.flush_output()?;
        trace!("at: wrote {} bytes", bytes.len());
        Ok(())
    }

    /// Writes one command line followed by CRLF as a single message.
    pub(super) fn send_command_bytes(&mut self, cmd_bytes: &[u8]) -> Result<(), WxError<IF::Error>> {
        self.write_all(cmd_bytes, timing::WRITE_TIMEOUT)?;
        self.write_all(b"\r\n", timing::WRITE_TIMEOUT)?;
        self.flush_output()
    }

    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), WxError<IF::Error>> {
        for byte in bytes {
            self.execute_blocking_io_with_timeout(timeout, |iface| iface.write_byte(*byte))?;
        }
        Ok(())
    }

    fn flush_output(&mut self) -> Result<(), WxError<IF::Error>> {
        let flush_timeout = Duration::from_millis(10);
        self.execute_blocking_io_with_timeout(flush_timeout, |iface| iface.flush())
    }
}
