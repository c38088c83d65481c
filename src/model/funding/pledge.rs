use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{address::Address, election::FailureKind};

use super::{
    amount::{Usd, Wei},
    price::Price,
};

/// Running totals pledged toward one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundedCandidate {
    pub candidate_address: Address,
    pub name: String,
    pub funding_amount: Wei,
    /// Dollar value of each pledge at the price cached when it was made.
    pub dollar_amount: Usd,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundingError {
    #[error("You need to spend more ETH!")]
    ZeroAmount,
    #[error("No ETH/USD price is available yet.")]
    NoPrice,
    #[error("Candidate name must not be empty.")]
    EmptyName,
    #[error("Funding amount overflow.")]
    Overflow,
    #[error("Only admin can perform this action.")]
    NotAdmin,
}

impl FundingError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ZeroAmount | Self::EmptyName | Self::Overflow => FailureKind::InvalidInput,
            Self::NoPrice => FailureKind::Precondition,
            Self::NotAdmin => FailureKind::Authorization,
        }
    }
}

/// Pledges toward candidates, the cached ETH/USD price, and the balance not
/// yet withdrawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingBook {
    candidates: Vec<FundedCandidate>,
    price: Option<Price>,
    balance: Wei,
}

impl FundingBook {
    /// Record a pledge of `amount` toward `candidate`, creating its entry on
    /// the first pledge.
    pub fn fund(
        &mut self,
        candidate: Address,
        name: String,
        amount: Wei,
    ) -> Result<&FundedCandidate, FundingError> {
        if amount.is_zero() {
            return Err(FundingError::ZeroAmount);
        }
        let price = self.price.ok_or(FundingError::NoPrice)?;
        let dollars = price.usd_value(amount).ok_or(FundingError::Overflow)?;
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(FundingError::Overflow)?;

        let index = match self.position(&candidate) {
            Some(index) => {
                let entry = &self.candidates[index];
                let funding_amount = entry
                    .funding_amount
                    .checked_add(amount)
                    .ok_or(FundingError::Overflow)?;
                let dollar_amount = entry
                    .dollar_amount
                    .checked_add(dollars)
                    .ok_or(FundingError::Overflow)?;

                let entry = &mut self.candidates[index];
                entry.funding_amount = funding_amount;
                entry.dollar_amount = dollar_amount;
                index
            }
            None => {
                if name.trim().is_empty() {
                    return Err(FundingError::EmptyName);
                }
                self.candidates.push(FundedCandidate {
                    candidate_address: candidate,
                    name,
                    funding_amount: amount,
                    dollar_amount: dollars,
                });
                self.candidates.len() - 1
            }
        };
        self.balance = balance;

        Ok(&self.candidates[index])
    }

    pub fn set_price(&mut self, price: Price) {
        self.price = Some(price);
    }

    /// Hand the whole balance to the admin and reset it to zero.
    pub fn withdraw(&mut self, admin: &Address, caller: &Address) -> Result<Wei, FundingError> {
        if admin != caller {
            return Err(FundingError::NotAdmin);
        }
        Ok(std::mem::take(&mut self.balance))
    }

    pub fn price(&self) -> Option<Price> {
        self.price
    }

    pub fn balance(&self) -> Wei {
        self.balance
    }

    pub fn candidates(&self) -> &[FundedCandidate] {
        &self.candidates
    }

    /// Total wei pledged toward `candidate`; zero if it never received a pledge.
    pub fn funding_for(&self, candidate: &Address) -> Wei {
        self.position(candidate)
            .map(|index| self.candidates[index].funding_amount)
            .unwrap_or_default()
    }

    fn position(&self, candidate: &Address) -> Option<usize> {
        self.candidates
            .iter()
            .position(|entry| &entry.candidate_address == candidate)
    }
}
