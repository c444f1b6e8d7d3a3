//! scoreflow-core - Score types and shared vocabulary for the scoreflow engine
//!
//! This crate provides the fundamental abstractions shared by every scoreflow
//! crate:
//! - Score types for representing solution quality (`SimpleScore`,
//!   `HardSoftScore`, `HardMediumSoftScore`)
//! - Constraint identity (`ConstraintId`, `ImpactType`)
//! - The error taxonomy (`ScoreFlowError`)

pub mod constraint;
pub mod error;
pub mod score;

pub use constraint::{ConstraintId, ImpactType};
pub use error::{Result, ScoreFlowError};
pub use score::{
    HardMediumSoftScore, HardSoftScore, ParseableScore, Score, ScoreLevel, ScoreParseError,
    SimpleScore,
};
