//! Classification of Alpha Vantage daily documents.
//!
//! Alpha Vantage reports most problems with HTTP 200 and a JSON body whose
//! top-level keys tell what happened:
//!
//! | key                   | meaning                                  |
//! |-----------------------|------------------------------------------|
//! | `Time Series (Daily)` | the data we asked for                    |
//! | `Error Message`       | bad symbol / bad request                 |
//! | `Note`                | per-minute or per-day quota exceeded     |
//! | `Information`         | quota / premium-endpoint notice          |
//!
//! [`DailyPayload::classify`] turns a document into one tagged value so the
//! ingest and curate stages react to the same signals in the same way.

use serde_json::{Map, Value};

/// Key holding the date → bar mapping.
pub const TIME_SERIES_KEY: &str = "Time Series (Daily)";
/// Key of a vendor error message.
pub const ERROR_MESSAGE_KEY: &str = "Error Message";
/// Key of a rate-limit note.
pub const NOTE_KEY: &str = "Note";
/// Key of an informational (usually quota) notice.
pub const INFORMATION_KEY: &str = "Information";

/// Bar field names inside the time series.
pub const OPEN_FIELD: &str = "1. open";
pub const HIGH_FIELD: &str = "2. high";
pub const LOW_FIELD: &str = "3. low";
pub const CLOSE_FIELD: &str = "4. close";
pub const VOLUME_FIELD: &str = "5. volume";

/// What a provider document turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum DailyPayload<'a> {
    /// A daily series keyed by `YYYY-MM-DD`.
    Series(&'a Map<String, Value>),
    /// The provider rejected the request.
    ProviderError(String),
    /// The provider refused because of quota / rate limits.
    RateLimited(String),
    /// No recognized signal and no time series; carries the top-level keys.
    Malformed { keys: Vec<String> },
    /// The time series key is present but does not hold an object; carries
    /// the JSON type found instead.
    InvalidSeries { found: &'static str },
}

impl<'a> DailyPayload<'a> {
    /// Classifies a provider document.
    ///
    /// Error signals win over data: a body carrying both an `Error Message` and
    /// a series is treated as an error.
    pub fn classify(document: &'a Value) -> Self {
        let Some(object) = document.as_object() else {
            return DailyPayload::Malformed { keys: Vec::new() };
        };

        if let Some(message) = object.get(ERROR_MESSAGE_KEY) {
            return DailyPayload::ProviderError(text(message));
        }
        if let Some(note) = object.get(NOTE_KEY).or_else(|| object.get(INFORMATION_KEY)) {
            return DailyPayload::RateLimited(text(note));
        }

        match object.get(TIME_SERIES_KEY) {
            Some(Value::Object(series)) => DailyPayload::Series(series),
            Some(other) => DailyPayload::InvalidSeries {
                found: json_type(other),
            },
            None => DailyPayload::Malformed {
                keys: object.keys().cloned().collect(),
            },
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
