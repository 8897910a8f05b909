//! Provider abstraction for end-of-day market data.
//!
//! This module defines the [`DataProvider`] trait, the contract the ingestion
//! stage uses to pull one symbol's daily series from a market data vendor.
//!
//! A provider only speaks HTTP: it returns the response document untouched.
//! Deciding whether a document is a usable series, a vendor error or a
//! rate-limit note is a separate classification step
//! ([`alpha_vantage::response::DailyPayload::classify`]) shared by ingestion
//! and curation.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use eod_pipeline::models::Symbol;
//! use eod_pipeline::providers::{DataProvider, ProviderError};
//!
//! struct CannedProvider;
//!
//! #[async_trait]
//! impl DataProvider for CannedProvider {
//!     fn code(&self) -> &'static str {
//!         "canned"
//!     }
//!
//!     async fn fetch_daily(&self, _symbol: &Symbol) -> Result<serde_json::Value, ProviderError> {
//!         Ok(serde_json::json!({ "Time Series (Daily)": {} }))
//!     }
//! }
//! ```

pub mod alpha_vantage;
pub mod throttle;

use async_trait::async_trait;
use reqwest::StatusCode;
use snafu::{Backtrace, Snafu};

use crate::models::Symbol;

/// Trait for fetching one symbol's raw daily series from a market data provider.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Short provider code used in raw partition keys (e.g. `alphavantage`).
    fn code(&self) -> &'static str;

    /// Fetches the daily series document for `symbol`.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The response body exactly as the provider sent it.
    /// * `Err(ProviderError)` - Transport failure or missing credentials.
    async fn fetch_daily(&self, symbol: &Symbol) -> Result<serde_json::Value, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Transport-level failure: network error, timeout, undecodable body, or
    /// a non-2xx status that wasn't absorbed by the throttle retry.
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// No API key was configured; raised before any request is sent.
    #[snafu(display("Missing ALPHAVANTAGE_KEY; refusing to call the provider without a credential"))]
    MissingCredential { backtrace: Backtrace },
}

impl ProviderError {
    /// HTTP status of the failed response, if the failure carried one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProviderError::Reqwest { source, .. } => source.status(),
            ProviderError::MissingCredential { .. } => None,
        }
    }
}
