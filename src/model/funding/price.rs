use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::amount::{Usd, Wei};

/// Decimal places carried by a [`Price`].
pub const PRICE_DECIMALS: u32 = 8;
const PRICE_SCALE: u128 = 10u128.pow(PRICE_DECIMALS);

/// The USD value of one ether, fixed point with [`PRICE_DECIMALS`] places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u128);

impl Price {
    /// A price from its raw fixed-point representation.
    pub fn from_scaled(scaled: u128) -> Self {
        Self(scaled)
    }

    /// A whole number of dollars per ether.
    pub fn from_dollars(dollars: u128) -> Option<Self> {
        dollars.checked_mul(PRICE_SCALE).map(Self)
    }

    pub fn scaled(self) -> u128 {
        self.0
    }

    /// Dollar value of `amount` at this price, with 18 decimals.
    ///
    /// Wei already carries 18 decimals, so multiplying by the price and
    /// dropping the price's own decimals lands on 18-decimal dollars.
    pub fn usd_value(self, amount: Wei) -> Option<Usd> {
        amount
            .get()
            .checked_mul(self.0)
            .map(|value| Usd::new(value / PRICE_SCALE))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / PRICE_SCALE;
        let fraction = self.0 % PRICE_SCALE;
        write!(f, "{whole}.{fraction:0width$}", width = PRICE_DECIMALS as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePriceError {
    #[error("price is empty")]
    Empty,
    #[error("price contains a non-digit character")]
    InvalidDigit,
    #[error("price is too large")]
    Overflow,
}

/// Parse a plain decimal such as `"2000.12"`. Digits past the eighth decimal
/// place are truncated.
impl FromStr for Price {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParsePriceError::Empty);
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(ParsePriceError::InvalidDigit);
        }

        let mut scaled: u128 = 0;
        let fraction_digits = fraction
            .chars()
            .chain(std::iter::repeat('0'))
            .take(PRICE_DECIMALS as usize);
        for digit in whole.chars().chain(fraction_digits) {
            scaled = scaled
                .checked_mul(10)
                .and_then(|value| value.checked_add(u128::from(digit as u8 - b'0')))
                .ok_or(ParsePriceError::Overflow)?;
        }
        Ok(Self(scaled))
    }
}

/// Prices serialize as the decimal string of their fixed-point value, the
/// same way amounts do.
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse::<u128>().map(Self).map_err(D::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("price feed request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("price feed returned an unusable price: {0}")]
    Malformed(#[from] ParsePriceError),
    #[error("price feed returned a zero price")]
    Zero,
}

/// Somewhere to get the current ETH/USD price from.
#[rocket::async_trait]
pub trait PriceSource: Send + Sync {
    async fn latest_price(&self) -> Result<Price, PriceFeedError>;
}

/// The price source held in managed state.
pub type PriceFeed = Arc<dyn PriceSource>;

/// A spot price response, e.g. from `https://api.coinbase.com/v2/prices/ETH-USD/spot`.
#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: String,
}

/// Fetches the price over HTTP from a spot price endpoint.
pub struct HttpPriceFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpPriceFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[rocket::async_trait]
impl PriceSource for HttpPriceFeed {
    async fn latest_price(&self) -> Result<Price, PriceFeedError> {
        let response: SpotResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let price: Price = response.data.amount.parse()?;
        if price.scaled() == 0 {
            return Err(PriceFeedError::Zero);
        }
        debug!("Fetched ETH/USD price {price} from {}", self.url);
        Ok(price)
    }
}

/// Always reports the same price.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrice(pub Price);

#[rocket::async_trait]
impl PriceSource for FixedPrice {
    async fn latest_price(&self) -> Result<Price, PriceFeedError> {
        Ok(self.0)
    }
}
