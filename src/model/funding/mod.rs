//! The candidate funding book: ETH pledges toward candidates, valued in USD
//! at the cached ETH/USD price.

pub use amount::{Usd, Wei};
pub use events::{EventBus, FundingEvent};
pub use pledge::{FundedCandidate, FundingBook, FundingError};
pub use price::{
    FixedPrice, HttpPriceFeed, ParsePriceError, Price, PriceFeed, PriceFeedError, PriceSource,
    PRICE_DECIMALS,
};

mod amount;
mod events;
mod pledge;
mod price;
