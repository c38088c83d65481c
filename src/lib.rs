#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, LedgerFairing, PriceFeedFairing};
use crate::logging::LoggerFairing;
use crate::model::{clock::Clock, funding::EventBus};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

/// The production server: MongoDB ledger, HTTP price feed, system clock.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build())
        .attach(LedgerFairing)
        .attach(PriceFeedFairing)
        .manage(Clock::system())
}

/// Everything that does not depend on where the ledger, prices and time
/// come from.
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(EventBus::default())
        .mount("/", api::routes())
        .register("/", catchers![error::json_catcher])
}
