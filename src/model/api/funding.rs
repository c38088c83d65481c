use serde::{Deserialize, Serialize};

use crate::model::{
    address::Address,
    funding::{Price, Wei, PRICE_DECIMALS},
};

/// A pledge of ether toward a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeRequest {
    pub candidate_address: Address,
    /// Display name recorded on the candidate's first pledge.
    pub name: String,
    pub amount: Wei,
}

/// The total pledged toward one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingTotal {
    pub candidate_address: Address,
    pub funding_amount: Wei,
}

/// The cached ETH/USD price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceView {
    /// Fixed point, with `decimals` decimal places.
    pub eth_usd_price: Price,
    pub decimals: u32,
}

impl From<Price> for PriceView {
    fn from(price: Price) -> Self {
        Self {
            eth_usd_price: price,
            decimals: PRICE_DECIMALS,
        }
    }
}

/// What a withdrawal paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub amount: Wei,
}
