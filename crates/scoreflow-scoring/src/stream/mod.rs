//! Fluent constraint stream API.
//!
//! The stream builders accumulate a [`ConstraintSetDef`] that a
//! [`ConstraintSession`](crate::network::ConstraintSession) is compiled
//! from:
//!
//! ```text
//! ConstraintFactory::new()
//!     .for_each::<Shift>()            -> UniConstraintStream<Shift>
//!     .filter(predicate)              -> UniConstraintStream<Shift>
//!     .join(other, joiners)           -> BiConstraintStream<Shift, Employee>
//!     .group_by(key, collector)       -> GroupedConstraintStream
//!     .penalize(weight)               -> constraint builder
//!     .as_constraint(name)            -> ConstraintId registered in the factory
//! ```

pub(crate) mod def;
mod bi_stream;
mod factory;
mod grouped_stream;
mod uni_stream;

pub use bi_stream::{BiConstraintBuilder, BiConstraintStream};
pub use def::ConstraintSetDef;
pub use factory::ConstraintFactory;
pub use grouped_stream::{GroupedConstraintBuilder, GroupedConstraintStream};
pub use uni_stream::{UniConstraintBuilder, UniConstraintStream};
