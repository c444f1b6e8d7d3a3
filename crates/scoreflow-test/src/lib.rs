//! Shared test fixtures for scoreflow crates.
//!
//! A small shift-scheduling domain: employees with a skill, shifts that
//! may be assigned to an employee. Enough surface to exercise joins,
//! filters, group-bys and fact updates.

pub mod scheduling;

pub use scheduling::{employee, shift, unassigned_shift, Employee, Shift};
