use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::address::Address;

use super::{
    candidate::{leading_candidate, Candidate},
    election_core::Election,
    registry::{Registry, Winner},
    voter::Voter,
};

/// Everything needed to independently check an election's tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDump {
    pub admin: Address,
    pub election: Option<Election>,
    pub candidates: Vec<Candidate>,
    pub voters: Vec<Voter>,
    /// The winner as reported by the server; only present once finalized.
    pub winner: Option<WinnerView>,
}

/// The public form of a winner: a candidate, or the "No winner" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerView {
    pub name: String,
    pub party: String,
    pub vote_count: u64,
}

/// Name reported when nobody received a vote.
pub const NO_WINNER: &str = "No winner";

impl WinnerView {
    pub fn no_winner() -> Self {
        Self {
            name: NO_WINNER.to_string(),
            party: String::new(),
            vote_count: 0,
        }
    }

    pub fn is_no_winner(&self) -> bool {
        self.name == NO_WINNER && self.vote_count == 0
    }
}

impl From<Winner<'_>> for WinnerView {
    fn from(winner: Winner<'_>) -> Self {
        match winner {
            Winner::Candidate(candidate) => Self {
                name: candidate.name.clone(),
                party: candidate.party.clone(),
                vote_count: candidate.vote_count,
            },
            Winner::NoWinner => Self::no_winner(),
        }
    }
}

impl From<&Registry> for ElectionDump {
    fn from(registry: &Registry) -> Self {
        Self {
            admin: *registry.admin(),
            election: registry.election().cloned(),
            candidates: registry.candidates().to_vec(),
            voters: registry.voters().to_vec(),
            winner: registry.winner().ok().map(WinnerView::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("candidate {0} is registered more than once")]
    DuplicateCandidate(Address),
    #[error("voter {0} is registered more than once")]
    DuplicateVoter(Address),
    #[error("candidate vote counts add up to more than a 64-bit tally")]
    TallyOverflow,
    #[error("candidates hold {votes} votes but {voted} voters have voted")]
    TallyMismatch { votes: u64, voted: u64 },
    #[error("votes were recorded before the election started")]
    VotesBeforeStart,
    #[error("a winner is reported but the election is not finalized")]
    PrematureWinner,
    #[error("the election is finalized but no winner is reported")]
    MissingWinner,
    #[error("reported winner {reported:?} differs from recomputed winner {expected:?}")]
    WrongWinner {
        reported: WinnerView,
        expected: WinnerView,
    },
}

impl ElectionDump {
    /// Check the dump is internally consistent: unique registrations, one
    /// counted vote per voter who voted, and the reported winner matches
    /// the tallies.
    pub fn verify(&self) -> Result<(), VerificationError> {
        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            if !seen.insert(candidate.candidate_address) {
                return Err(VerificationError::DuplicateCandidate(
                    candidate.candidate_address,
                ));
            }
        }
        let mut seen = HashSet::new();
        for voter in &self.voters {
            if !seen.insert(voter.voter_address) {
                return Err(VerificationError::DuplicateVoter(voter.voter_address));
            }
        }

        let votes = self
            .candidates
            .iter()
            .try_fold(0_u64, |total, c| total.checked_add(c.vote_count))
            .ok_or(VerificationError::TallyOverflow)?;
        let voted = self.voters.iter().filter(|v| v.has_voted).count() as u64;
        if votes != voted {
            return Err(VerificationError::TallyMismatch { votes, voted });
        }

        let started = self.election.as_ref().map_or(false, |e| e.started);
        let finalized = self.election.as_ref().map_or(false, |e| e.finalized);
        if votes > 0 && !started {
            return Err(VerificationError::VotesBeforeStart);
        }

        match (&self.winner, finalized) {
            (Some(_), false) => Err(VerificationError::PrematureWinner),
            (None, true) => Err(VerificationError::MissingWinner),
            (None, false) => Ok(()),
            (Some(reported), true) => {
                let expected = leading_candidate(&self.candidates)
                    .map(Winner::Candidate)
                    .unwrap_or(Winner::NoWinner)
                    .into();
                if reported == &expected {
                    Ok(())
                } else {
                    Err(VerificationError::WrongWinner {
                        reported: reported.clone(),
                        expected,
                    })
                }
            }
        }
    }
}
