pub mod address;
pub mod api;
pub mod auth;
pub mod clock;
pub mod election;
pub mod funding;
pub mod ledger;
