//! Incremental constraint-matching score engine.
//!
//! Given a working solution (a set of facts) and a set of declared
//! constraints, this crate reports - after every incremental change - the
//! exact aggregate weighted score, bit-for-bit equal to a from-scratch
//! recomputation.
//!
//! # Architecture
//!
//! Constraints are declared through the fluent [`stream`] API and compiled
//! into a [`ConstraintSession`]: a directed network of source, join,
//! filter, group and sink nodes. Fact events propagate synchronously
//! through the network; sinks turn surviving tuples into weighted
//! constraint matches, and the [`matches`] bookkeeping keeps the running
//! totals, per-fact indictments and the aggregate score in lockstep.
//!
//! ```
//! use scoreflow_core::HardSoftScore;
//! use scoreflow_scoring::stream::ConstraintFactory;
//! use scoreflow_scoring::{ConstraintSession, Fact};
//!
//! #[derive(Debug)]
//! struct Shift;
//!
//! let factory = ConstraintFactory::<HardSoftScore>::new();
//! factory
//!     .for_each::<Shift>()
//!     .penalize(HardSoftScore::of_hard(1))
//!     .as_constraint("Every shift costs one");
//!
//! let mut session = ConstraintSession::build(factory.build()).unwrap();
//! for id in 0..3 {
//!     session.insert(Fact::new(id, Shift)).unwrap();
//! }
//! assert_eq!(session.calculate_score(), HardSoftScore::of_hard(-3));
//! ```

// The dynamic network stores erased mappings; signatures get involved.
#![allow(clippy::type_complexity)]

pub mod api;
pub mod collector;
pub mod director;
pub mod joiner;
pub mod stream;
pub mod topology;

mod fact;
mod key;
mod mapping;
mod matches;
mod network;
mod tuple;

pub use fact::{Fact, FactKey};
pub use key::IndexKey;
pub use mapping::{TupleKeyMapping, TuplePredicate, TupleValueMapping};
pub use matches::{
    ConstraintMatch, ConstraintMatchTotal, Indictment, Justification, MatchId, MatchRegistry,
};
pub use network::ConstraintSession;
pub use tuple::{GroupRow, Tuple, TupleId};

pub use api::analysis::{ConstraintAnalysis, MatchSummary, ScoreExplanation};
pub use api::weight_overrides::ConstraintWeightOverrides;
pub use collector::{GroupResult, TupleCollector};
pub use director::{FromScratchScoreDirector, IncrementalScoreDirector, ScoreCalculator};
pub use stream::{ConstraintFactory, ConstraintSetDef};
pub use topology::{NetworkTopology, TopologyNode};
