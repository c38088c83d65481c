//! Guard predicates shared by the election operations.
//!
//! Each gate either lets the operation through or names the reason it is
//! rejected. Gates never mutate anything.

use chrono::{DateTime, Duration, Utc};

use crate::model::address::Address;

use super::error::BallotError;

/// Open while `now` is strictly earlier than `cutoff - lead`. A closing time
/// before the representable range counts as already closed.
pub fn before(
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    lead: Duration,
) -> Result<(), BallotError> {
    match cutoff.checked_sub_signed(lead) {
        Some(closes_at) if now < closes_at => Ok(()),
        _ => Err(BallotError::RegistrationClosed),
    }
}

/// Open while `start <= now <= end`.
pub fn during(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), BallotError> {
    if start <= now && now <= end {
        Ok(())
    } else {
        Err(BallotError::OutsideVotingWindow)
    }
}

/// Open once `now` is strictly later than `time`.
pub fn after(now: DateTime<Utc>, time: DateTime<Utc>) -> Result<(), BallotError> {
    if now > time {
        Ok(())
    } else {
        Err(BallotError::TooEarly)
    }
}

pub fn not_finalized(finalized: bool) -> Result<(), BallotError> {
    if finalized {
        Err(BallotError::Finalized)
    } else {
        Ok(())
    }
}

pub fn admin_only(admin: &Address, caller: &Address) -> Result<(), BallotError> {
    if admin == caller {
        Ok(())
    } else {
        Err(BallotError::NotAdmin)
    }
}
