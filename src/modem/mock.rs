// src/modem/mock.rs

//! Simulated-time serial interface shared by the modem tests.

use crate::common::{
    hal_traits::{SerialChannel, Timer},
    timing::Instant,
};
use nb::Result as NbResult;
use std::collections::VecDeque;
use std::vec::Vec;

/// Time one byte takes on the wire at 115200 baud, rounded up.
pub const BYTE_TIME_US: u64 = 87;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockCommError;

/// What the simulated module sends back after one flushed message.
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay_us: u64,
    pub bytes: Vec<u8>,
}

pub struct MockInterface {
    pub current_time_us: u64,
    read_queue: VecDeque<(u64, u8)>,
    replies: VecDeque<Option<Reply>>,
    pending: Vec<u8>,
    messages: Vec<Vec<u8>>,
    pub write_calls: usize,
    pub read_calls: usize,
    pub fail_writes: bool,
    pub read_errors: usize,
    /// Delays no longer advance time, as with a counter that never started.
    pub freeze_clock: bool,
}

impl MockInterface {
    pub fn new() -> Self {
        MockInterface {
            current_time_us: 0,
            read_queue: VecDeque::new(),
            replies: VecDeque::new(),
            pending: Vec::new(),
            messages: Vec::new(),
            write_calls: 0,
            read_calls: 0,
            fail_writes: false,
            read_errors: 0,
            freeze_clock: false,
        }
    }

    pub fn advance_time(&mut self, us: u64) {
        self.current_time_us = self.current_time_us.saturating_add(us);
    }

    /// Bytes arriving back to back, the first at `at_us`.
    pub fn stage_read_data_at(&mut self, at_us: u64, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.read_queue.push_back((at_us + i as u64 * BYTE_TIME_US, *byte));
        }
    }

    /// Queues the module's answer to the next flushed message.
    pub fn stage_reply(&mut self, delay_ms: u64, data: &[u8]) {
        self.replies.push_back(Some(Reply { delay_us: delay_ms * 1000, bytes: data.to_vec() }));
    }

    /// The next flushed message gets no answer at all.
    pub fn stage_silence(&mut self) {
        self.replies.push_back(None);
    }

    /// Everything written, split at each flush.
    pub fn messages(&self) -> &[Vec<u8>] {
        &self.messages
    }

    pub fn message_str(&self, index: usize) -> &str {
        std::str::from_utf8(&self.messages[index]).unwrap()
    }
}

impl Timer for MockInterface {
    fn now(&self) -> Instant {
        Instant::from_micros(self.current_time_us)
    }
    fn delay_us(&mut self, us: u32) {
        if !self.freeze_clock {
            self.advance_time(us as u64);
        }
    }
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

impl SerialChannel for MockInterface {
    type Error = MockCommError;

    fn read_byte(&mut self) -> NbResult<u8, Self::Error> {
        self.read_calls += 1;
        if self.read_errors > 0 {
            self.read_errors -= 1;
            return Err(nb::Error::Other(MockCommError));
        }
        match self.read_queue.front() {
            Some((at, byte)) if *at <= self.current_time_us => {
                let byte = *byte;
                self.read_queue.pop_front();
                Ok(byte)
            }
            _ => Err(nb::Error::WouldBlock),
        }
    }

    fn write_byte(&mut self, byte: u8) -> NbResult<(), Self::Error> {
        self.write_calls += 1;
        if self.fail_writes {
            return Err(nb::Error::Other(MockCommError));
        }
        self.pending.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> NbResult<(), Self::Error> {
        let message = std::mem::take(&mut self.pending);
        self.messages.push(message);
        if let Some(Some(reply)) = self.replies.pop_front() {
            let at = self.current_time_us + reply.delay_us;
            self.stage_read_data_at(at, &reply.bytes);
        }
        Ok(())
    }
}
