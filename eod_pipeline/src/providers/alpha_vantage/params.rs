use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::models::Symbol;

/// The API function to call. Only the free daily endpoint is used.
#[derive(Clone, Copy, Debug, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Function {
    #[default]
    TimeSeriesDaily,
}

/// How much history the provider returns.
#[derive(Clone, Copy, Debug, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputSize {
    /// The latest 100 data points.
    #[default]
    Compact,
}

/// Query string of a daily series request.
///
/// Not `Debug`: it carries the API key in clear text.
#[derive(Clone, Serialize)]
pub struct DailySeriesParams<'a> {
    pub function: Function,
    pub symbol: &'a str,
    pub outputsize: OutputSize,
    pub apikey: &'a str,
}

impl<'a> DailySeriesParams<'a> {
    /// The fixed request shape used by the ingest stage.
    pub fn compact(symbol: &'a Symbol, api_key: &'a SecretString) -> Self {
        Self {
            function: Function::TimeSeriesDaily,
            symbol: symbol.as_str(),
            outputsize: OutputSize::Compact,
            apikey: api_key.expose_secret(),
        }
    }
}
