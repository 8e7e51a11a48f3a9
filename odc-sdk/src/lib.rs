//! Shared types and API clients for Open Dispatch Console.
//!
//! The `objects` module holds every wire type exchanged between the
//! dispatch server, the admin console and the driver app. The `client`
//! module (cargo feature `client`) adds typed HTTP clients on top so
//! downstream crates that only need the shared types do not pull in
//! `reqwest`.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
