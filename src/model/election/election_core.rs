use std::fmt::{Display, Formatter};

use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single election held by a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    /// Election name.
    pub name: String,
    /// Candidate registration closes and voting opens at this time.
    #[serde(with = "ts_seconds")]
    pub start_date: DateTime<Utc>,
    /// Voting closes after this time.
    #[serde(with = "ts_seconds")]
    pub end_date: DateTime<Utc>,
    /// Set once by the admin, enabling voting.
    pub started: bool,
    /// Set once by the admin, freezing the tallies.
    pub finalized: bool,
}

impl Election {
    pub fn new(name: String, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            name,
            start_date,
            end_date,
            started: false,
            finalized: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.finalized {
            Phase::Finalized
        } else if self.started {
            Phase::Started
        } else {
            Phase::Created
        }
    }
}

/// States in the election lifecycle. `Finalized` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No election has been created yet.
    Uncreated,
    /// Registration is open; voting has not been enabled.
    Created,
    /// Voting is enabled (within the election's time window).
    Started,
    /// Tallies are frozen and the winner can be read.
    Finalized,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uncreated => "uncreated",
            Self::Created => "created",
            Self::Started => "started",
            Self::Finalized => "finalized",
        };
        write!(f, "{name}")
    }
}
