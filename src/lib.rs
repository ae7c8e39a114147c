// src/lib.rs

#![cfg_attr(not(any(test, feature = "std")), no_std)] // Specify no_std at the crate root

pub mod common;
pub mod modem;
pub mod sensor;
pub mod weather;

// Re-export key types for convenience
pub use common::{CommandResult, WxError};
pub use modem::AtModem;
pub use sensor::{Dht11, SensorReading};
pub use weather::{Field, WeatherFields};
