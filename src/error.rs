use jsonwebtoken::errors::Error as JwtError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::{serde_json::json, Json, Value},
    Request,
};
use thiserror::Error;

use crate::model::{
    election::{BallotError, FailureKind},
    funding::{FundingError, PriceFeedError},
    ledger::StoreError,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ballot(#[from] BallotError),
    #[error(transparent)]
    Funding(#[from] FundingError),
    #[error(transparent)]
    PriceFeed(#[from] PriceFeedError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found.", what.into()))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Ballot(err) => kind_status(err.kind()),
            Self::Funding(err) => kind_status(err.kind()),
            Self::PriceFeed(_) => Status::BadGateway,
            Self::Store(StoreError::Conflict { .. }) => Status::Conflict,
            Self::Store(_) => Status::InternalServerError,
            Self::Jwt(_) => Status::Unauthorized,
            Self::Status(status, _) => *status,
        }
    }
}

/// HTTP status for each class of rejected operation.
pub fn kind_status(kind: FailureKind) -> Status {
    match kind {
        FailureKind::Authorization | FailureKind::NotEligible => Status::Forbidden,
        FailureKind::Timing
        | FailureKind::Duplicate
        | FailureKind::AlreadyActed
        | FailureKind::Precondition => Status::Conflict,
        FailureKind::InvalidReference => Status::NotFound,
        FailureKind::InvalidInput => Status::UnprocessableEntity,
    }
}

/// Respond with the mapped status and `{"error": "<reason>"}`.
impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let reason = match status.code {
            500..=599 => {
                error!("{self}");
                // Infrastructure details stay in the logs.
                status.reason_lossy().to_string()
            }
            _ => {
                debug!("Rejected: {self}");
                self.to_string()
            }
        };
        (status, Json(json!({ "error": reason }))).respond_to(req)
    }
}

/// Why a request guard turned a request away, kept for [`json_catcher`].
struct GuardFailure(Option<String>);

/// Record the reason a request guard failed, so the catcher can report it.
pub fn record_guard_failure(req: &Request<'_>, reason: impl ToString) {
    let reason = reason.to_string();
    req.local_cache(move || GuardFailure(Some(reason)));
}

/// Gives failures raised by Rocket itself the same `{"error": reason}` body.
#[catch(default)]
pub fn json_catcher(status: Status, req: &Request<'_>) -> (Status, Json<Value>) {
    let reason = match &req.local_cache(|| GuardFailure(None)).0 {
        Some(reason) => reason.clone(),
        None => status.reason_lossy().to_string(),
    };
    (status, Json(json!({ "error": reason })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_failure_kind() {
        assert_eq!(Error::from(BallotError::NotAdmin).status(), Status::Forbidden);
        assert_eq!(Error::from(BallotError::NotEligible).status(), Status::Forbidden);
        assert_eq!(Error::from(BallotError::AlreadyVoted).status(), Status::Conflict);
        assert_eq!(
            Error::from(BallotError::RegistrationClosed).status(),
            Status::Conflict
        );
        assert_eq!(
            Error::from(BallotError::InvalidCandidate).status(),
            Status::NotFound
        );
        assert_eq!(
            Error::from(BallotError::InvalidSchedule).status(),
            Status::UnprocessableEntity
        );
        assert_eq!(
            Error::from(FundingError::ZeroAmount).status(),
            Status::UnprocessableEntity
        );
        assert_eq!(
            Error::from(StoreError::Conflict { attempted: 3 }).status(),
            Status::Conflict
        );
        assert_eq!(
            Error::from(StoreError::VersionOutOfRange(u64::MAX)).status(),
            Status::InternalServerError
        );
    }
}
