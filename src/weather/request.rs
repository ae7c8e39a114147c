// src/weather/request.rs

use core::fmt::Write;
use heapless::String;

use crate::common::{command::CommandFormatError, config::WeatherTarget};

/// Capacity for a formatted request.
pub const REQUEST_CAPACITY: usize = 512;

/// A formatted request, ready to be streamed after the send prompt.
pub type RequestText = String<REQUEST_CAPACITY>;

/// Formats the `GET` request for `target`.
///
/// The connection is closed by the server after the response, which is
/// what ends the receive on the module side.
///
/// # Errors
///
/// [`CommandFormatError::LineBreak`] if any part would inject a header line,
/// [`CommandFormatError::Empty`] for an empty host or path, and
/// [`CommandFormatError::TooLong`] if the request exceeds [`REQUEST_CAPACITY`].
pub fn format_request(target: &WeatherTarget<'_>) -> Result<RequestText, CommandFormatError> {
    if target.host.is_empty() || target.path.is_empty() {
        return Err(CommandFormatError::Empty);
    }
    let parts = [target.host, target.path, target.user_agent];
    if parts.iter().any(|p| p.contains(['\r', '\n'])) {
        return Err(CommandFormatError::LineBreak);
    }

    let mut request = RequestText::new();
    write!(
        request,
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nConnection: close\r\n\r\n",
        target.path, target.host, target.user_agent
    )
    .map_err(|_| CommandFormatError::TooLong)?;
    Ok(request)
}
