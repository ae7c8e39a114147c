// src/sensor/mod.rs

//! Bit-banged driver for the DHT11 humidity/temperature sensor.
//!
//! One read cycle is a blocking, busy-polled exchange on a single line:
//!
//! 1. host start condition: low for 18 ms, high for 30 us, then input;
//! 2. sensor acknowledgement: low, high, low, each within 100 us;
//! 3. 40 bits: a low gap, then a high phase whose length is the bit
//!    (longer than 30 us is a `1`), each edge within 200 us;
//! 4. checksum over the first four bytes.
//!
//! Nothing is retried here. Callers re-read after at least
//! [`MIN_READ_INTERVAL`](crate::common::timing::MIN_READ_INTERVAL), and call
//! [`Dht11::init`] once after power-up.

mod frame;

pub use frame::{classify_pulse, RawFrame, SensorReading, FRAME_BITS, FRAME_BYTES};

use crate::common::{
    hal_traits::{DataLine, Direction, Level, Timer},
    timing::{self, PollWindow},
    WxError,
};
use core::time::Duration;
use log::{debug, warn};

/// A DHT11 attached to one data line.
#[derive(Debug)]
pub struct Dht11<L, T>
where
    L: DataLine,
    T: Timer,
{
    line: L,
    timer: T,
    last_widths: [u32; FRAME_BITS],
}

impl<L, T> Dht11<L, T>
where
    L: DataLine,
    T: Timer,
{
    pub fn new(line: L, timer: T) -> Self {
        Dht11 {
            line,
            timer,
            last_widths: [0; FRAME_BITS],
        }
    }

    /// Gives the line and timer back.
    pub fn release(self) -> (L, T) {
        (self.line, self.timer)
    }

    /// High-phase widths (microseconds) measured by the most recent read
    /// that got through the acknowledgement. Bits not reached stay zero.
    pub fn last_pulse_widths(&self) -> &[u32; FRAME_BITS] {
        &self.last_widths
    }

    /// Holds the line high through the sensor's power-up settling time
    /// ([`POWER_UP_SETTLE`](timing::POWER_UP_SETTLE)), then releases it.
    ///
    /// Reads issued earlier than this after power-up are not answered.
    pub fn init(&mut self) -> Result<(), WxError<L::Error>> {
        self.line
            .set_direction(Direction::Output)
            .map_err(WxError::Io)?;
        self.line.set_level(Level::High).map_err(WxError::Io)?;
        self.timer
            .delay_ms(timing::POWER_UP_SETTLE.as_millis() as u32);
        self.line
            .set_direction(Direction::Input)
            .map_err(WxError::Io)?;
        debug!("dht11: line settled");
        Ok(())
    }

    /// Performs one full read cycle.
    pub fn read(&mut self) -> Result<SensorReading, WxError<L::Error>> {
        self.send_start_signal()?;
        self.await_acknowledge()?;
        let frame = self.read_frame()?;

        let reading = frame.reading::<L::Error>().map_err(|e| {
            warn!(
                "dht11: checksum mismatch frame={:02x?} calculated={:#04x}",
                frame.as_bytes(),
                frame.calculated_checksum()
            );
            e
        })?;
        debug!(
            "dht11: humidity={}% temperature={}C",
            reading.humidity, reading.temperature
        );
        Ok(reading)
    }

    fn send_start_signal(&mut self) -> Result<(), WxError<L::Error>> {
        self.line
            .set_direction(Direction::Output)
            .map_err(WxError::Io)?;
        self.line.set_level(Level::Low).map_err(WxError::Io)?;
        self.timer
            .delay_ms(timing::START_SIGNAL_LOW.as_millis() as u32);
        self.line.set_level(Level::High).map_err(WxError::Io)?;
        self.timer
            .delay_us(timing::START_RELEASE_HIGH.as_micros() as u32);
        self.line
            .set_direction(Direction::Input)
            .map_err(WxError::Io)
    }

    fn await_acknowledge(&mut self) -> Result<(), WxError<L::Error>> {
        // Sensor pulls low, releases high, then pulls low again before bit 0
        for (phase, level) in [
            ("ack-low", Level::High),
            ("ack-high", Level::Low),
            ("ack-end", Level::High),
        ] {
            self.wait_while(level, timing::ACK_PHASE_TIMEOUT)
                .map_err(|e| self.log_timeout(e, phase, None))?;
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Result<RawFrame, WxError<L::Error>> {
        self.last_widths = [0; FRAME_BITS];
        for bit in 0..FRAME_BITS {
            self.wait_while(Level::Low, timing::BIT_EDGE_TIMEOUT)
                .map_err(|e| self.log_timeout(e, "bit-start", Some(bit)))?;
            let high = self
                .wait_while(Level::High, timing::BIT_EDGE_TIMEOUT)
                .map_err(|e| self.log_timeout(e, "bit-high", Some(bit)))?;
            self.last_widths[bit] = u32::try_from(high.as_micros()).unwrap_or(u32::MAX);
        }
        Ok(RawFrame::from_pulse_widths(&self.last_widths))
    }

    /// Busy-polls while the line sits at `level`; returns how long it stayed.
    fn wait_while(
        &mut self,
        level: Level,
        budget: Duration,
    ) -> Result<Duration, WxError<L::Error>> {
        let mut window =
            PollWindow::new(self.timer.now(), budget).with_step(timing::LINE_POLL_STEP);
        while let Some(elapsed) = window.poll(self.timer.now()) {
            if self.line.level().map_err(WxError::Io)? != level {
                return Ok(elapsed);
            }
            self.timer
                .delay_us(timing::LINE_POLL_STEP.as_micros() as u32);
        }
        Err(WxError::Timeout)
    }

    fn log_timeout(
        &self,
        err: WxError<L::Error>,
        phase: &str,
        bit: Option<usize>,
    ) -> WxError<L::Error> {
        if matches!(err, WxError::Timeout) {
            match bit {
                Some(bit) => warn!("dht11: timeout phase={} bit={}", phase, bit),
                None => warn!("dht11: timeout phase={}", phase),
            }
        }
        err
    }
}
