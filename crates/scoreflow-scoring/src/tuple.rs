//! Tuples: cached, computed rows flowing through the network.
//!
//! A tuple is owned exclusively by the node that created it; downstream
//! nodes receive clones carrying the originating node's tuple id, and derive
//! rows with fresh ids of their own. Fact payloads are shared (`Arc`), so a
//! clone is cheap.

use std::fmt;

use smallvec::SmallVec;

use crate::collector::GroupResult;
use crate::fact::Fact;
use crate::key::IndexKey;

/// Stable identity of one tuple within one session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleId(pub(crate) u64);

impl fmt::Debug for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Allocates tuple ids for one session.
#[derive(Debug, Default)]
pub(crate) struct TupleIdGen {
    next: u64,
}

impl TupleIdGen {
    pub(crate) fn next(&mut self) -> TupleId {
        let id = TupleId(self.next);
        self.next += 1;
        id
    }
}

/// The aggregate row carried by tuples emitted from a group node.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupRow {
    /// The group key.
    pub key: IndexKey,
    /// The finished collector result for the group.
    pub result: GroupResult,
}

/// One matched combination of facts at one network node.
#[derive(Clone, Debug)]
pub struct Tuple {
    id: TupleId,
    facts: SmallVec<[Fact; 2]>,
    group: Option<GroupRow>,
}

impl Tuple {
    pub(crate) fn of_fact(id: TupleId, fact: Fact) -> Self {
        Self {
            id,
            facts: smallvec::smallvec![fact],
            group: None,
        }
    }

    pub(crate) fn of_pair(id: TupleId, left: &Tuple, right: &Tuple) -> Self {
        let mut facts = left.facts.clone();
        facts.extend(right.facts.iter().cloned());
        Self {
            id,
            facts,
            group: None,
        }
    }

    pub(crate) fn of_group(id: TupleId, key: IndexKey, result: GroupResult) -> Self {
        Self {
            id,
            facts: SmallVec::new(),
            group: Some(GroupRow { key, result }),
        }
    }

    /// Clones this row under a new identity, for derived rows in
    /// pass-through nodes.
    pub(crate) fn derive(&self, id: TupleId) -> Self {
        Self {
            id,
            facts: self.facts.clone(),
            group: self.group.clone(),
        }
    }

    /// Returns this tuple's identity.
    #[inline]
    pub fn id(&self) -> TupleId {
        self.id
    }

    /// Returns the facts combined in this tuple, leftmost stream first.
    #[inline]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Returns the fact at `position`, or None for group rows.
    #[inline]
    pub fn fact(&self, position: usize) -> Option<&Fact> {
        self.facts.get(position)
    }

    /// Returns the aggregate row for tuples emitted by a group node.
    #[inline]
    pub fn group(&self) -> Option<&GroupRow> {
        self.group.as_ref()
    }

    pub(crate) fn set_fact(&mut self, position: usize, fact: Fact) {
        self.facts[position] = fact;
    }

    pub(crate) fn set_group_result(&mut self, result: GroupResult) {
        if let Some(row) = self.group.as_mut() {
            row.result = result;
        }
    }

    /// Human-readable description of the tuple's content, used for
    /// justifications.
    pub fn describe(&self) -> String {
        if let Some(row) = &self.group {
            return format!("{:?} -> {:?}", row.key, row.result);
        }
        let parts: Vec<String> = self.facts.iter().map(|f| format!("{f:?}")).collect();
        parts.join(", ")
    }
}
