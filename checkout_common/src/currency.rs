use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// ISO-4217 style currency code, always stored in lower case (`usd`, `eur`). Crypto currencies use their ticker
/// (`eth`, `btc`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new<S: AsRef<str>>(code: S) -> Self {
        Self(code.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_ethereum(&self) -> bool {
        self.0 == "eth"
    }

    pub fn is_bitcoin(&self) -> bool {
        matches!(self.0.as_str(), "btc" | "xbt")
    }

    /// Upper case code, as required by most gateway APIs.
    pub fn to_upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("usd".into())
    }
}

impl From<String> for Currency {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Currency {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
