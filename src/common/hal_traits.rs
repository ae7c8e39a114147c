// src/common/hal_traits.rs

use super::timing::Instant;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Abstraction for the monotonic clock and delays used by both subsystems.
pub trait Timer {
    /// Current value of the free-running microsecond counter.
    fn now(&self) -> Instant;

    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Abstraction for the serial link to the radio module (the Serial Byte Channel).
///
/// All operations are non-blocking; bounded blocking waits are built on top
/// of them by the modem layer.
pub trait SerialChannel {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to read a single byte from the serial interface.
    ///
    /// Returns `Ok(byte)` if a byte was read, or `Err(nb::Error::WouldBlock)`
    /// if no byte is available yet. Other errors are returned as `Err(nb::Error::Other(Self::Error))`.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Ok(())` if the byte was accepted for transmission, or `Err(nb::Error::WouldBlock)`
    /// if the write buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer, ensuring all written bytes have been sent.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;
}

/// Direction of the bidirectional sensor line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Logic level on the sensor line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// The single digital line the one-wire sensor is attached to.
///
/// Direction is mutated in place; callers must serialize access to the line.
pub trait DataLine {
    type Error: Debug;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error>;

    fn level(&mut self) -> Result<Level, Self::Error>;
}

/// `DataLine` over an open-drain embedded-hal pin with an external pull-up.
///
/// An open-drain pin reads back the bus, so switching to input just means
/// releasing the line high.
#[derive(Debug)]
pub struct OpenDrainLine<P> {
    pin: P,
}

impl<P> OpenDrainLine<P>
where
    P: InputPin + OutputPin,
{
    pub fn new(pin: P) -> Self {
        OpenDrainLine { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P> DataLine for OpenDrainLine<P>
where
    P: InputPin + OutputPin,
{
    type Error = P::Error;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        match direction {
            Direction::Input => self.pin.set_high(),
            Direction::Output => Ok(()),
        }
    }

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        match level {
            Level::Low => self.pin.set_low(),
            Level::High => self.pin.set_high(),
        }
    }

    fn level(&mut self) -> Result<Level, Self::Error> {
        self.pin.is_high().map(Level::from)
    }
}

/// Source of the free-running microsecond count, e.g. a DWT cycle counter
/// scaled to microseconds or a hardware timer.
pub trait MicrosCounter {
    fn now_us(&self) -> u64;
}

/// `Timer` built from a microsecond counter and an embedded-hal delay.
#[derive(Debug)]
pub struct HalTimer<C, D> {
    counter: C,
    delay: D,
}

impl<C, D> HalTimer<C, D>
where
    C: MicrosCounter,
    D: DelayNs,
{
    pub fn new(counter: C, delay: D) -> Self {
        HalTimer { counter, delay }
    }

    pub fn release(self) -> (C, D) {
        (self.counter, self.delay)
    }
}

impl<C, D> Timer for HalTimer<C, D>
where
    C: MicrosCounter,
    D: DelayNs,
{
    fn now(&self) -> Instant {
        Instant::from_micros(self.counter.now_us())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
