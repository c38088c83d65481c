pub use candidate::{leading_candidate, Candidate};
pub use dump::{ElectionDump, VerificationError, WinnerView, NO_WINNER};
pub use election_core::{Election, Phase};
pub use error::{BallotError, FailureKind};
pub use registry::{Context, Registry, Winner};
pub use voter::Voter;

pub mod gate;

mod candidate;
mod dump;
mod election_core;
mod error;
mod registry;
mod voter;
