use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A ticker was empty (or only whitespace) after trimming.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("symbol cannot be empty")]
pub struct EmptySymbolError;

/// An opaque ticker identifier drawn from the configured universe.
///
/// The only validation is non-emptiness; a symbol the provider doesn't know
/// fails at fetch time instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol from a (trimmed) ticker string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, EmptySymbolError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EmptySymbolError);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses a comma-separated universe such as `"AAPL,MSFT, TSLA"`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, EmptySymbolError> {
        raw.split(',').map(Self::new).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = EmptySymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
