// src/common/timing.rs

use core::ops::{Add, Sub};
use core::time::Duration;

// === Monotonic time ===

/// A point on the free-running microsecond counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(u64);

impl Instant {
    pub const fn from_micros(us: u64) -> Self {
        Instant(us)
    }

    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    #[inline]
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Instant {
    type Output = Self;
    fn add(self, rhs: Duration) -> Self {
        Instant(self.0.saturating_add(rhs.as_micros() as u64))
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;
    fn sub(self, rhs: Instant) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

// === Bounded polling ===

/// A wait budget that every busy-poll loop in the crate runs inside.
///
/// `poll(now)` hands back the elapsed time while the loop is still inside its
/// budget, and `None` once either the clock passed the budget or the optional
/// poll cap is used up. Loops are written as
/// `while let Some(elapsed) = window.poll(timer.now()) { .. }`, so termination
/// does not depend on a hand-maintained counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PollWindow {
    start: Instant,
    budget: Duration,
    max_polls: Option<u32>,
    polls: u32,
}

impl PollWindow {
    pub fn new(start: Instant, budget: Duration) -> Self {
        PollWindow {
            start,
            budget,
            max_polls: None,
            polls: 0,
        }
    }

    /// Additionally caps the number of polls, independent of the clock.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Caps polls for a loop that sleeps `step` between polls.
    pub fn with_step(self, step: Duration) -> Self {
        let step_us = step.as_micros().max(1);
        let cap = (self.budget.as_micros() / step_us).saturating_add(1);
        self.with_max_polls(u32::try_from(cap).unwrap_or(u32::MAX))
    }

    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        if let Some(max) = self.max_polls {
            if self.polls >= max {
                return None;
            }
        }
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed > self.budget {
            return None;
        }
        self.polls = self.polls.saturating_add(1);
        Some(elapsed)
    }

    /// Restarts the window from `now`, keeping budget and cap.
    pub fn restart(&mut self, now: Instant) {
        self.start = now;
        self.polls = 0;
    }

    #[inline]
    pub fn start(&self) -> Instant {
        self.start
    }

    #[inline]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.budget
    }
}

// === DHT11 one-wire timing ===

/// Host start condition: line held low for at least this long.
pub const START_SIGNAL_LOW: Duration = Duration::from_millis(18);
/// Line released high after the start condition, before switching to input.
pub const START_RELEASE_HIGH: Duration = Duration::from_micros(30);
/// Budget for each of the three acknowledgement phases.
pub const ACK_PHASE_TIMEOUT: Duration = Duration::from_micros(100);
/// Budget for the low-to-high bit-start edge and for the high phase itself.
pub const BIT_EDGE_TIMEOUT: Duration = Duration::from_micros(200);
/// High phases strictly longer than this are a `1` bit.
pub const BIT_ONE_THRESHOLD: Duration = Duration::from_micros(30);
/// Sampling step of the edge-wait loops.
pub const LINE_POLL_STEP: Duration = Duration::from_micros(1);
/// Callers should space reads at least this far apart.
pub const MIN_READ_INTERVAL: Duration = Duration::from_secs(2);
/// Settling time after power-up before the first read.
pub const POWER_UP_SETTLE: Duration = Duration::from_secs(2);

// === ESP-AT serial timing ===

/// Sleep between non-blocking serial polls that returned `WouldBlock`.
pub const SERIAL_IDLE_POLL: Duration = Duration::from_micros(100);
/// Per-byte wait inside a command transaction.
pub const COMMAND_BYTE_WAIT: Duration = Duration::from_millis(10);
/// Budget for pushing one command line into the UART.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Budget for the raw HTTP request body after the `>` prompt.
pub const PAYLOAD_WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Liveness check (`AT`).
pub const ATTENTION_TIMEOUT: Duration = Duration::from_millis(2000);
/// Station mode selection (`AT+CWMODE=1`).
pub const STATION_MODE_TIMEOUT: Duration = Duration::from_millis(2000);
/// Access point join (`AT+CWJAP`); DHCP included.
pub const JOIN_TIMEOUT: Duration = Duration::from_millis(15_000);
/// Local address query (`AT+CIFSR`).
pub const QUERY_ADDRESS_TIMEOUT: Duration = Duration::from_millis(3000);
/// TCP connect (`AT+CIPSTART`).
pub const OPEN_TCP_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Send prompt (`AT+CIPSEND` until `>`).
pub const SEND_PROMPT_TIMEOUT: Duration = Duration::from_millis(3000);
/// Connection teardown (`AT+CIPCLOSE`).
pub const CLOSE_TIMEOUT: Duration = Duration::from_millis(3000);

// === Payload aggregation ===

/// Whole-payload deadline.
pub const PAYLOAD_TOTAL_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Heuristic end-of-transmission window after the last byte.
pub const PAYLOAD_SILENCE_TIMEOUT: Duration = Duration::from_millis(500);
/// Per-byte wait while aggregating.
pub const PAYLOAD_BYTE_WAIT: Duration = Duration::from_millis(100);
