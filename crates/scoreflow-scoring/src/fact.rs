//! Type-erased planning facts.
//!
//! The engine never inspects a fact beyond the mapping functions the
//! constraint author declared, so facts cross the engine boundary as
//! type-erased handles with an explicit identity. Identity is
//! `(fact type, caller-assigned id)`; the payload is shared, never cloned
//! per node.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of one fact: its concrete type plus a caller-assigned id.
///
/// The id only needs to be unique within one fact type; the score director
/// typically uses the entity's planning id or its index in the solution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    type_id: TypeId,
    id: u64,
}

impl FactKey {
    /// Returns the caller-assigned id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactKey(#{})", self.id)
    }
}

/// A fact participating in constraint evaluation.
///
/// Equality and hashing use the [`FactKey`] only: a fact whose payload
/// mutated is still the *same* fact, which is what makes
/// `update(fact)` meaningful.
///
/// # Example
///
/// ```
/// use scoreflow_scoring::Fact;
///
/// #[derive(Debug)]
/// struct Shift { employee: usize }
///
/// let fact = Fact::new(7, Shift { employee: 3 });
/// assert_eq!(fact.key().id(), 7);
/// assert_eq!(fact.downcast_ref::<Shift>().unwrap().employee, 3);
/// ```
#[derive(Clone)]
pub struct Fact {
    key: FactKey,
    type_name: &'static str,
    display: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl Fact {
    /// Creates a fact handle from a concrete value.
    pub fn new<T: fmt::Debug + Send + Sync + 'static>(id: u64, value: T) -> Self {
        let display = format!("{:?}", value);
        Self {
            key: FactKey {
                type_id: TypeId::of::<T>(),
                id,
            },
            type_name: std::any::type_name::<T>(),
            display: display.into(),
            value: Arc::new(value),
        }
    }

    /// Creates a fact handle with a custom display string.
    pub fn with_display<T: Send + Sync + 'static>(id: u64, value: T, display: String) -> Self {
        Self {
            key: FactKey {
                type_id: TypeId::of::<T>(),
                id,
            },
            type_name: std::any::type_name::<T>(),
            display: display.into(),
            value: Arc::new(value),
        }
    }

    /// Returns the fact's identity.
    #[inline]
    pub fn key(&self) -> FactKey {
        self.key
    }

    /// Returns the `TypeId` of the underlying value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.key.type_id
    }

    /// Returns the type name of the underlying value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the short type name (without module path).
    pub fn short_type_name(&self) -> &str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    /// Returns the display string captured at construction.
    #[inline]
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Attempts to downcast to the concrete value type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({})",
            self.short_type_name(),
            self.key.id,
            self.display
        )
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
