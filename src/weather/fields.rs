// src/weather/fields.rs

use core::str;
use heapless::String;

use crate::common::buffer::find;

/// Longest value stored per field, in bytes.
pub const MAX_FIELD_LEN: usize = 64;

/// Bounded text of one extracted field.
pub type FieldValue = String<MAX_FIELD_LEN>;

/// A named piece of information carried in a payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Location,
    Condition,
    Temperature,
    Humidity,
    Wind,
    DateTime,
}

impl Field {
    pub const COUNT: usize = 6;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Location,
        Field::Condition,
        Field::Temperature,
        Field::Humidity,
        Field::Wind,
        Field::DateTime,
    ];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Location => "location",
            Field::Condition => "condition",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Wind => "wind",
            Field::DateTime => "datetime",
        }
    }
}

/// Where a field's value begins: the literal right before it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldMarker {
    pub field: Field,
    pub open: &'static str,
}

impl FieldMarker {
    pub const fn new(field: Field, open: &'static str) -> Self {
        FieldMarker { field, open }
    }
}

/// Markers for the `key=value;` line produced by the weather service format string.
pub const WEATHER_MARKERS: &[FieldMarker] = &[
    FieldMarker::new(Field::Location, "loc="),
    FieldMarker::new(Field::Condition, "cond="),
    FieldMarker::new(Field::Temperature, "temp="),
    FieldMarker::new(Field::Humidity, "hum="),
    FieldMarker::new(Field::Wind, "wind="),
];

/// Marker for the local time in a time-service JSON body.
pub const TIME_MARKERS: &[FieldMarker] = &[FieldMarker::new(Field::DateTime, "\"datetime\":")];

const HEADER_END: &[u8] = b"\r\n\r\n";
const STATUS_LINE: &[u8] = b"HTTP/";

/// Skips transport framing and headers, if present.
///
/// The body starts after the first blank line following the status line.
/// Without a status line, the first blank line counts. Without any blank
/// line, the whole text is the body.
pub fn payload_body(text: &[u8]) -> &[u8] {
    let from = find(text, STATUS_LINE).unwrap_or(0);
    match find(&text[from..], HEADER_END) {
        Some(pos) => &text[from + pos + HEADER_END.len()..],
        None => text,
    }
}

/// Field values found in one payload.
///
/// Each field holds the first value found for it; a field that was not
/// found, or whose value was empty, stays unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherFields {
    values: [Option<FieldValue>; Field::COUNT],
}

impl WeatherFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every field named in `markers` from a received payload.
    ///
    /// # Arguments
    ///
    /// * `payload`: Raw received bytes, framing and headers included.
    /// * `markers`: Which fields to look for and the literal preceding each.
    ///
    /// # Returns
    ///
    /// The fields that were found. Extraction never fails; a payload with
    /// no markers yields an empty set. Running it twice on the same input
    /// gives the same result, and the order of `markers` does not matter
    /// unless two markers name the same field.
    pub fn extract(payload: &[u8], markers: &[FieldMarker]) -> Self {
        let body = payload_body(payload);
        let mut fields = Self::new();
        for marker in markers {
            if let Some(value) = value_after(body, marker.open.as_bytes()) {
                fields.set(marker.field, value);
            }
        }
        fields
    }

    /// Stores `value` for `field` unless it already has one. Values longer
    /// than [`MAX_FIELD_LEN`] are cut at a character boundary.
    ///
    /// Returns `true` if the value was stored.
    pub fn set(&mut self, field: Field, value: &str) -> bool {
        let slot = &mut self.values[field.index()];
        if slot.is_some() || value.is_empty() {
            return false;
        }
        let mut stored = FieldValue::new();
        for c in value.chars() {
            if stored.push(c).is_err() {
                break;
            }
        }
        *slot = Some(stored);
        true
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values[field.index()].is_some()
    }

    /// Number of fields that have a value.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    /// Whole degrees from a value like `+25°C` or `-3°C`.
    pub fn temperature_celsius(&self) -> Option<i16> {
        leading_number(self.get(Field::Temperature)?)
    }

    /// Percent from a value like `40%`.
    pub fn humidity_percent(&self) -> Option<u8> {
        let value = leading_number(self.get(Field::Humidity)?)?;
        u8::try_from(value).ok().filter(|h| *h <= 100)
    }
}

/// Value following the first occurrence of `open` in `body`.
///
/// A quoted value runs to the closing quote. Otherwise it runs to the
/// next `;`, CR, LF or the end of the body.
fn value_after<'a>(body: &'a [u8], open: &[u8]) -> Option<&'a str> {
    if open.is_empty() {
        return None;
    }
    let start = find(body, open)? + open.len();
    let rest = trim_start(&body[start..]);

    let raw = match rest.split_first() {
        Some((b'"', quoted)) => {
            let end = quoted
                .iter()
                .position(|b| matches!(b, b'"' | b'\r' | b'\n'))
                .unwrap_or(quoted.len());
            &quoted[..end]
        }
        _ => {
            let end = rest
                .iter()
                .position(|b| matches!(b, b';' | b'\r' | b'\n'))
                .unwrap_or(rest.len());
            &rest[..end]
        }
    };

    let text = utf8_prefix(trim_end(raw));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| **b == b' ').count();
    &bytes[skip..]
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let keep = bytes.len() - bytes.iter().rev().take_while(|b| **b == b' ').count();
    &bytes[..keep]
}

/// Longest valid UTF-8 prefix; a value cut mid-character loses that character.
fn utf8_prefix(bytes: &[u8]) -> &str {
    match str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

fn leading_number(value: &str) -> Option<i16> {
    let end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '+' || *c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}
