use serde::{Deserialize, Serialize};

use crate::model::address::Address;

/// A registered participant, permitted exactly one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub voter_address: Address,
    pub name: String,
    pub age: u32,
    pub has_voted: bool,
}

impl Voter {
    pub fn new(voter_address: Address, name: String, age: u32) -> Self {
        Self {
            voter_address,
            name,
            age,
            has_voted: false,
        }
    }
}
