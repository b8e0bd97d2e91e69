//! Core domain types and logic.

pub mod allocation;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod optimizer;
pub mod preset;
pub mod price_history;
pub mod signal;
pub mod signal_parser;
pub mod strategy;
