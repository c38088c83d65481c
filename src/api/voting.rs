use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::election::VoteRequest,
    auth::AuthToken,
    clock::Clock,
    election::{Candidate, Context},
    ledger::Ledger,
};

pub fn routes() -> Vec<Route> {
    routes![vote]
}

/// Cast the caller's vote. Returns the candidate with its updated count.
#[post("/election/votes", data = "<ballot>", format = "json")]
pub async fn vote(
    token: AuthToken,
    ballot: Json<VoteRequest>,
    ledger: &State<Ledger>,
    clock: &State<Clock>,
) -> Result<Json<Candidate>> {
    let caller = token.address();
    let candidate = ledger
        .transact_at(clock, |state, now| {
            Ok(state
                .registry
                .vote(&Context::new(caller, now), &ballot.candidate_address)?
                .clone())
        })
        .await?;

    info!("{caller} voted");
    Ok(Json(candidate))
}
