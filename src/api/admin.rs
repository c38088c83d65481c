use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::election::{CandidateSpec, ElectionSpec, VoterSpec},
    auth::AuthToken,
    clock::Clock,
    election::{Candidate, Context, Election, Voter},
    ledger::Ledger,
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        add_candidate,
        add_voter,
        start_election,
        end_election,
    ]
}

#[post("/election", data = "<spec>", format = "json")]
pub async fn create_election(
    token: AuthToken,
    spec: Json<ElectionSpec>,
    ledger: &State<Ledger>,
    clock: &State<Clock>,
) -> Result<Json<Election>> {
    let caller = token.address();
    let ElectionSpec {
        name,
        start_date,
        end_date,
    } = spec.into_inner();

    let election = ledger
        .transact_at(clock, |state, now| {
            let ctx = Context::new(caller, now);
            Ok(state
                .registry
                .create_election(&ctx, name, start_date, end_date)?
                .clone())
        })
        .await?;

    info!(
        "Created election '{}' running {} to {}",
        election.name, election.start_date, election.end_date
    );
    Ok(Json(election))
}

#[post("/election/candidates", data = "<spec>", format = "json")]
pub async fn add_candidate(
    token: AuthToken,
    spec: Json<CandidateSpec>,
    ledger: &State<Ledger>,
    clock: &State<Clock>,
) -> Result<Json<Candidate>> {
    let caller = token.address();
    let CandidateSpec {
        candidate_address,
        name,
        party,
        image,
    } = spec.into_inner();

    let candidate = ledger
        .transact_at(clock, |state, now| {
            let ctx = Context::new(caller, now);
            Ok(state
                .registry
                .add_candidate(&ctx, candidate_address, name, party, image)?
                .clone())
        })
        .await?;

    info!("Added candidate {}", candidate.candidate_address);
    Ok(Json(candidate))
}

#[post("/election/voters", data = "<spec>", format = "json")]
pub async fn add_voter(
    token: AuthToken,
    spec: Json<VoterSpec>,
    ledger: &State<Ledger>,
    clock: &State<Clock>,
) -> Result<Json<Voter>> {
    let caller = token.address();
    let VoterSpec {
        voter_address,
        name,
        age,
    } = spec.into_inner();

    let voter = ledger
        .transact_at(clock, |state, now| {
            let ctx = Context::new(caller, now);
            Ok(state
                .registry
                .add_voter(&ctx, voter_address, name, age)?
                .clone())
        })
        .await?;

    info!("Added voter {}", voter.voter_address);
    Ok(Json(voter))
}

#[post("/election/start")]
pub async fn start_election(
    token: AuthToken,
    ledger: &State<Ledger>,
    clock: &State<Clock>,
) -> Result<()> {
    let caller = token.address();
    ledger
        .transact_at(clock, |state, now| {
            Ok(state.registry.start_election(&Context::new(caller, now))?)
        })
        .await?;
    info!("Election started");
    Ok(())
}

#[post("/election/end")]
pub async fn end_election(
    token: AuthToken,
    ledger: &State<Ledger>,
    clock: &State<Clock>,
) -> Result<()> {
    let caller = token.address();
    ledger
        .transact_at(clock, |state, now| {
            Ok(state.registry.end_election(&Context::new(caller, now))?)
        })
        .await?;
    info!("Election finalized");
    Ok(())
}
