//! Trading pair and order side, e.g. `LTC/BTC` `SELL`.

use std::fmt;
use std::str::FromStr;

/// A currency pair such as `LTC/BTC`. The base currency is the
/// user-facing on-chain leg; the quote currency is the Lightning leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| PairParseError(s.to_string()))?;
        Ok(Self::new(base, quote))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("`{0}` is not a valid pair, expected BASE/QUOTE")]
pub struct PairParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}
