use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::address::Address;

/// An election specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    /// Election name.
    pub name: String,
    /// Election start time.
    #[serde(with = "ts_seconds")]
    pub start_date: DateTime<Utc>,
    /// Election end time.
    #[serde(with = "ts_seconds")]
    pub end_date: DateTime<Utc>,
}

/// A candidate registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub candidate_address: Address,
    pub name: String,
    pub party: String,
    pub image: String,
}

/// A voter registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterSpec {
    pub voter_address: Address,
    pub name: String,
    pub age: u32,
}

/// A ballot: the candidate the caller votes for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub candidate_address: Address,
}
