use thiserror::Error;

/// Broad classes of rejected election operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The caller is not the admin.
    Authorization,
    /// The operation is outside its permitted window or lifecycle phase.
    Timing,
    /// The record being created already exists.
    Duplicate,
    /// The caller is not a registered voter.
    NotEligible,
    /// The caller has already voted.
    AlreadyActed,
    /// The operation refers to a record that does not exist.
    InvalidReference,
    /// A required earlier step has not happened yet.
    Precondition,
    /// The supplied arguments are malformed.
    InvalidInput,
}

/// Reasons an election operation is rejected. A rejected operation never
/// changes any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("Only admin can perform this action.")]
    NotAdmin,
    #[error("Action not allowed after this time.")]
    RegistrationClosed,
    #[error("Action only allowed during the election.")]
    OutsideVotingWindow,
    #[error("Action only allowed after this time.")]
    TooEarly,
    #[error("Election has not started.")]
    NotStarted,
    #[error("Election has already started.")]
    AlreadyStarted,
    #[error("Election has already been finalized.")]
    Finalized,
    #[error("Election has already been created.")]
    ElectionExists,
    #[error("Candidate already added.")]
    CandidateExists,
    #[error("Voter already added.")]
    VoterExists,
    #[error("You are not eligible to vote.")]
    NotEligible,
    #[error("You have already voted.")]
    AlreadyVoted,
    #[error("Invalid candidate.")]
    InvalidCandidate,
    #[error("Election has not been finalized.")]
    NotFinalized,
    #[error("No election has been created.")]
    NoElection,
    #[error("{0} must not be empty.")]
    EmptyName(&'static str),
    #[error("Election must start before it ends.")]
    InvalidSchedule,
    #[error("Vote count overflow.")]
    VoteCountOverflow,
}

impl BallotError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotAdmin => FailureKind::Authorization,
            Self::RegistrationClosed
            | Self::OutsideVotingWindow
            | Self::TooEarly
            | Self::NotStarted
            | Self::AlreadyStarted
            | Self::Finalized => FailureKind::Timing,
            Self::ElectionExists | Self::CandidateExists | Self::VoterExists => {
                FailureKind::Duplicate
            }
            Self::NotEligible => FailureKind::NotEligible,
            Self::AlreadyVoted => FailureKind::AlreadyActed,
            Self::InvalidCandidate => FailureKind::InvalidReference,
            Self::NotFinalized | Self::NoElection => FailureKind::Precondition,
            Self::EmptyName(_) | Self::InvalidSchedule | Self::VoteCountOverflow => {
                FailureKind::InvalidInput
            }
        }
    }
}
