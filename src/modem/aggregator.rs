// src/modem/aggregator.rs

use super::AtModem;
use crate::common::{
    buffer::ReceiveBuffer,
    config::AggregatorConfig,
    error::WxError,
    hal_traits::{SerialChannel, Timer},
    timing::{self, Instant, PollWindow},
};
use core::time::Duration;
use log::{debug, info, warn};

/// Why a bulk receive stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The configured terminal marker was buffered.
    TerminalMarker,
    /// No byte arrived for the silence window after data had started.
    Silence,
    /// The total deadline passed.
    Deadline,
}

/// Summary of one bulk receive. The bytes themselves stay in the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PayloadReport {
    pub completion: Completion,
    /// Bytes read off the line, including any that did not fit.
    pub received: usize,
    /// Bytes discarded because the buffer was full.
    pub dropped: usize,
    pub elapsed: Duration,
}

impl PayloadReport {
    /// `true` when nothing at all arrived.
    pub fn is_empty(&self) -> bool {
        self.received == 0
    }
}

impl<IF> AtModem<IF>
where
    IF: SerialChannel + Timer,
{
    /// Collects a bulk response of unknown length into `rx`.
    ///
    /// Stops at whichever comes first: the terminal marker, `silence_timeout`
    /// without a byte once data has started, or `total_timeout`. A quiet
    /// line before the first byte only ends at the deadline.
    pub fn receive_payload<const N: usize>(
        &mut self,
        rx: &mut ReceiveBuffer<N>,
        cfg: &AggregatorConfig,
    ) -> PayloadReport {
        rx.clear();
        let start = self.interface.now();
        let mut window = PollWindow::new(start, cfg.total_timeout);
        // Bounds the loop even if the clock never advances; bytes don't count
        let mut idle =
            PollWindow::new(start, cfg.total_timeout).with_step(timing::SERIAL_IDLE_POLL);
        let marker = cfg
            .terminal_marker
            .map(str::as_bytes)
            .filter(|m| !m.is_empty());
        let mut last_byte: Option<Instant> = None;
        let mut received = 0usize;

        let completion = loop {
            let Some(elapsed) = window.poll(self.interface.now()) else {
                break Completion::Deadline;
            };

            let mut wait = cfg.byte_wait.min(cfg.total_timeout.saturating_sub(elapsed));
            if let Some(last) = last_byte {
                let quiet = self.interface.now().saturating_duration_since(last);
                wait = wait.min(cfg.silence_timeout.saturating_sub(quiet));
            }

            let read = self.read_one(wait);
            if read.is_err() && idle.poll(self.interface.now()).is_none() {
                break Completion::Deadline;
            }
            match read {
                Ok(byte) => {
                    received += 1;
                    last_byte = Some(self.interface.now());
                    let stored = rx.push(byte);
                    if let (true, Some(m)) = (stored, marker) {
                        if rx.ends_with(m) {
                            break Completion::TerminalMarker;
                        }
                    }
                }
                Err(WxError::Io(e)) => {
                    warn!("payload: read error: {:?}", e);
                    self.interface
                        .delay_us(timing::SERIAL_IDLE_POLL.as_micros() as u32);
                }
                Err(_) => {}
            }

            if let Some(last) = last_byte {
                if self.interface.now().saturating_duration_since(last) >= cfg.silence_timeout {
                    break Completion::Silence;
                }
            }
        };

        let elapsed = self.interface.now().saturating_duration_since(start);
        if rx.dropped() > 0 {
            warn!("payload: buffer full, {} bytes dropped", rx.dropped());
        }
        if received == 0 {
            warn!("payload: nothing received in {} ms", elapsed.as_millis());
        } else {
            info!(
                "payload: {} bytes in {} ms ({:?})",
                received,
                elapsed.as_millis(),
                completion
            );
        }
        debug!("payload: {:?}", rx.as_str_lossy());

        PayloadReport {
            completion,
            received,
            dropped: rx.dropped(),
            elapsed,
        }
    }
}
