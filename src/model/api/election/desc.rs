use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::election::{Election, Phase, Registry};

/// An API-friendly election description, including where it is in its
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    pub phase: Phase,
    /// Absent until the election is created.
    #[serde(flatten)]
    pub election: Option<Election>,
    /// Whether the end date has passed, regardless of phase.
    pub voting_closed: bool,
}

impl ElectionDescription {
    pub fn new(registry: &Registry, now: DateTime<Utc>) -> Self {
        Self {
            phase: registry.phase(),
            election: registry.election().cloned(),
            voting_closed: registry.voting_window_closed(now),
        }
    }
}
