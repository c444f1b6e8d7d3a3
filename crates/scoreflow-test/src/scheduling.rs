//! The shift-scheduling fixture domain.

use scoreflow_scoring::Fact;

/// An employee with one skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: u64,
    pub skill: &'static str,
}

/// A shift, possibly assigned to an employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub id: u64,
    pub employee: Option<u64>,
    pub day: u32,
    pub required_skill: &'static str,
}

/// Builds an employee fact. The fact id is the employee id.
pub fn employee(id: u64, skill: &'static str) -> Fact {
    Fact::new(id, Employee { id, skill })
}

/// Builds a shift fact assigned to an employee. The fact id is the shift id.
pub fn shift(id: u64, employee: u64, day: u32, required_skill: &'static str) -> Fact {
    Fact::new(
        id,
        Shift {
            id,
            employee: Some(employee),
            day,
            required_skill,
        },
    )
}

/// Builds an unassigned shift fact.
pub fn unassigned_shift(id: u64, day: u32, required_skill: &'static str) -> Fact {
    Fact::new(
        id,
        Shift {
            id,
            employee: None,
            day,
            required_skill,
        },
    )
}
