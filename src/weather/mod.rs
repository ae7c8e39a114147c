// src/weather/mod.rs

//! Payload side of the weather link: the request that goes out after the
//! send prompt and the field extraction run over what comes back.

pub mod fields;
pub mod request;

pub use fields::{
    payload_body, Field, FieldMarker, FieldValue, WeatherFields, MAX_FIELD_LEN, TIME_MARKERS,
    WEATHER_MARKERS,
};
pub use request::{format_request, RequestText, REQUEST_CAPACITY};
