//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Field names are camelCase.
//! - Datetimes are serialised as Unix timestamps.
//! - Amounts are serialised as decimal strings.

pub mod election;
pub mod funding;
pub mod session;
