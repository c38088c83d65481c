use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    address::Address,
    api::election::ElectionDescription,
    clock::Clock,
    election::{Candidate, ElectionDump, Voter, WinnerView},
    ledger::Ledger,
};

pub fn routes() -> Vec<Route> {
    routes![
        admin,
        election,
        election_name,
        election_started,
        election_finalized,
        candidates,
        voters,
        winner,
        dump,
    ]
}

#[get("/admin")]
pub async fn admin(ledger: &State<Ledger>) -> Json<Address> {
    Json(*ledger.read().await.registry.admin())
}

#[get("/election")]
pub async fn election(ledger: &State<Ledger>, clock: &State<Clock>) -> Json<ElectionDescription> {
    let state = ledger.read().await;
    Json(ElectionDescription::new(&state.registry, clock.now()))
}

/// The election name; empty until the election is created.
#[get("/election/name")]
pub async fn election_name(ledger: &State<Ledger>) -> Json<String> {
    let state = ledger.read().await;
    Json(state.registry.election_name().unwrap_or_default().to_string())
}

#[get("/election/started")]
pub async fn election_started(ledger: &State<Ledger>) -> Json<bool> {
    Json(ledger.read().await.registry.has_election_started())
}

#[get("/election/finalized")]
pub async fn election_finalized(ledger: &State<Ledger>) -> Json<bool> {
    Json(ledger.read().await.registry.has_election_finalized())
}

#[get("/election/candidates")]
pub async fn candidates(ledger: &State<Ledger>) -> Json<Vec<Candidate>> {
    Json(ledger.read().await.registry.candidates().to_vec())
}

#[get("/election/voters")]
pub async fn voters(ledger: &State<Ledger>) -> Json<Vec<Voter>> {
    Json(ledger.read().await.registry.voters().to_vec())
}

#[get("/election/winner")]
pub async fn winner(ledger: &State<Ledger>) -> Result<Json<WinnerView>> {
    let state = ledger.read().await;
    let winner = state.registry.winner()?;
    Ok(Json(winner.into()))
}

/// Everything needed to audit the election offline.
#[get("/election/dump")]
pub async fn dump(ledger: &State<Ledger>) -> Json<ElectionDump> {
    Json(ElectionDump::from(&ledger.read().await.registry))
}
