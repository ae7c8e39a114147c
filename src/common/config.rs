// src/common/config.rs

use core::time::Duration;

use super::timing;

/// Settings for one bulk-payload receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Deadline for the whole receive.
    pub total_timeout: Duration,
    /// End-of-transmission is assumed after this long without a byte.
    /// Only armed once the first byte has arrived.
    pub silence_timeout: Duration,
    /// Wait for each individual byte.
    pub byte_wait: Duration,
    /// Literal that ends the receive as soon as it is buffered.
    pub terminal_marker: Option<&'static str>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            total_timeout: timing::PAYLOAD_TOTAL_TIMEOUT,
            silence_timeout: timing::PAYLOAD_SILENCE_TIMEOUT,
            byte_wait: timing::PAYLOAD_BYTE_WAIT,
            // The module reports the remote close after the body
            terminal_marker: Some("CLOSED"),
        }
    }
}

/// Timeouts for the connectivity sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub attention_timeout: Duration,
    pub station_mode_timeout: Duration,
    pub join_timeout: Duration,
    pub query_address_timeout: Duration,
    pub open_tcp_timeout: Duration,
    pub send_prompt_timeout: Duration,
    pub close_timeout: Duration,
    /// Per-byte wait inside command transactions.
    pub command_byte_wait: Duration,
    pub payload: AggregatorConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            attention_timeout: timing::ATTENTION_TIMEOUT,
            station_mode_timeout: timing::STATION_MODE_TIMEOUT,
            join_timeout: timing::JOIN_TIMEOUT,
            query_address_timeout: timing::QUERY_ADDRESS_TIMEOUT,
            open_tcp_timeout: timing::OPEN_TCP_TIMEOUT,
            send_prompt_timeout: timing::SEND_PROMPT_TIMEOUT,
            close_timeout: timing::CLOSE_TIMEOUT,
            command_byte_wait: timing::COMMAND_BYTE_WAIT,
            payload: AggregatorConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Doubles every network-facing timeout, for a retry on a poor link.
    pub fn patient() -> Self {
        let base = Self::default();
        Self {
            join_timeout: base.join_timeout * 2,
            open_tcp_timeout: base.open_tcp_timeout * 2,
            send_prompt_timeout: base.send_prompt_timeout * 2,
            payload: AggregatorConfig {
                total_timeout: base.payload.total_timeout * 2,
                silence_timeout: base.payload.silence_timeout * 2,
                ..base.payload
            },
            ..base
        }
    }
}

/// Where the payload request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Request path including the query, e.g. `/Beijing?format=...`.
    pub path: &'a str,
    pub user_agent: &'a str,
}

impl Default for WeatherTarget<'_> {
    fn default() -> Self {
        Self {
            host: "wttr.in",
            port: 80,
            path: "/Beijing?format=loc=%l;cond=%C;temp=%t;hum=%h;wind=%w",
            user_agent: "ESP32WeatherClock",
        }
    }
}

impl<'a> WeatherTarget<'a> {
    /// Network time from worldtimeapi.org for the given zone path.
    pub fn time_api(path: &'a str) -> Self {
        Self {
            host: "worldtimeapi.org",
            port: 80,
            path,
            user_agent: "ESP32WeatherClock",
        }
    }
}
