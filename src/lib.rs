//! tactical-alloc: per-epoch capital allocation engine.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the replay CLI in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
