#![deny(warnings)]

//! League rules: player progression, team valuation and standings.
//!
//! Everything here is a pure function of stored facts. Nothing is cached;
//! callers recompute on every read. This crate provides:
//! - Star player points, level thresholds and level-up eligibility
//! - Effective characteristics, skills and market value of a player
//! - Total team value and pre-match inducements
//! - League tables with their tie-break order

use thiserror::Error;

pub mod progression;
pub mod standings;
pub mod valuation;

pub use progression::*;
pub use standings::*;
pub use valuation::*;

/// Errors produced by invalid rule configuration.
#[derive(Debug, Error, PartialEq)]
pub enum RulesError {
    /// The threshold table must start at 0 SPP and strictly increase.
    #[error("invalid level thresholds: {0:?}")]
    InvalidThresholds(Vec<u32>),
    /// Attribute floor outside the sensible range.
    #[error("invalid attribute floor: {0}")]
    InvalidFloor(i32),
}
