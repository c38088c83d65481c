use rocket::tokio::sync::broadcast::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::model::address::Address;

use super::{amount::Wei, price::Price};

/// Something observable happened to the funding book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FundingEvent {
    #[serde(rename_all = "camelCase")]
    CandidateFunded { candidate: Address, eth_amount: Wei },
    #[serde(rename_all = "camelCase")]
    PriceUpdated { eth_usd_price: Price },
}

impl FundingEvent {
    /// Event name, as used for the server-sent event `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CandidateFunded { .. } => "CandidateFunded",
            Self::PriceUpdated { .. } => "PriceUpdated",
        }
    }
}

/// Fan-out of funding events to every current subscriber.
///
/// Slow subscribers that fall more than `capacity` events behind skip the
/// oldest ones.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<FundingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    pub fn publish(&self, event: FundingEvent) {
        trace!("Publishing funding event {event:?}");
        // Only fails when nobody is listening, which is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Receiver<FundingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
