//! Alpha Vantage `TIME_SERIES_DAILY` provider.

pub mod params;
pub mod provider;
pub mod response;

pub use params::{DailySeriesParams, OutputSize};
pub use provider::{AlphaVantageProvider, BASE_URL, PROVIDER_CODE};
pub use response::DailyPayload;
