use serde::{Deserialize, Serialize};

use crate::model::address::Address;

/// A registered contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub candidate_address: Address,
    pub name: String,
    pub party: String,
    /// Opaque reference to the candidate's picture, e.g. an IPFS URI.
    pub image: String,
    pub vote_count: u64,
}

impl Candidate {
    pub fn new(candidate_address: Address, name: String, party: String, image: String) -> Self {
        Self {
            candidate_address,
            name,
            party,
            image,
            vote_count: 0,
        }
    }
}

/// Pick the winner: the first candidate, in registration order, holding the
/// strictly greatest vote count. A later candidate only takes the lead by
/// beating the current leader, so ties go to whoever registered first.
/// Returns `None` when nobody received a vote.
pub fn leading_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .filter(|candidate| candidate.vote_count > 0)
        .fold(None, |leader: Option<&Candidate>, candidate| match leader {
            Some(leader) if leader.vote_count >= candidate.vote_count => Some(leader),
            _ => Some(candidate),
        })
}
