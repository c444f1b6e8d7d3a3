// Constraint factory: the entry point of the fluent stream API.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use scoreflow_core::Score;

use super::def::{ConstraintDef, ConstraintSetDef, StreamId, StreamOp};
use super::uni_stream::UniConstraintStream;

pub(crate) struct FactoryInner<Sc: Score> {
    pub(crate) streams: Vec<StreamOp>,
    pub(crate) constraints: Vec<ConstraintDef<Sc>>,
    source_by_type: HashMap<TypeId, StreamId>,
}

impl<Sc: Score> FactoryInner<Sc> {
    pub(crate) fn push_stream(&mut self, op: StreamOp) -> StreamId {
        let id = self.streams.len();
        self.streams.push(op);
        id
    }
}

// Factory for declaring constraints over type-erased facts.
//
// `ConstraintFactory` is parameterized by the score type `Sc`. Streams
// created from one factory share its definition; `build()` snapshots the
// accumulated declarations into an immutable [`ConstraintSetDef`].
//
// # Example
//
// ```
// use scoreflow_core::SimpleScore;
// use scoreflow_scoring::stream::ConstraintFactory;
// use scoreflow_scoring::{ConstraintSession, Fact};
//
// #[derive(Debug)]
// struct Shift { employee: Option<u64> }
//
// let factory = ConstraintFactory::<SimpleScore>::new();
// factory
//     .for_each::<Shift>()
//     .filter(|shift: &Shift| shift.employee.is_none())
//     .penalize(SimpleScore::of(1))
//     .as_constraint("Unassigned shift");
//
// let mut session = ConstraintSession::build(factory.build()).unwrap();
// session.insert(Fact::new(0, Shift { employee: None })).unwrap();
// session.insert(Fact::new(1, Shift { employee: Some(7) })).unwrap();
// assert_eq!(session.calculate_score(), SimpleScore::of(-1));
// ```
pub struct ConstraintFactory<Sc: Score> {
    inner: Rc<RefCell<FactoryInner<Sc>>>,
}

impl<Sc: Score> ConstraintFactory<Sc> {
    // Creates a new, empty factory.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(FactoryInner {
                streams: Vec::new(),
                constraints: Vec::new(),
                source_by_type: HashMap::new(),
            })),
        }
    }

    // Creates (or reuses) the stream of all facts of type `A`.
    //
    // Declaring `for_each` twice for one type shares a single source
    // stream, so the compiled network has one source node per fact type.
    pub fn for_each<A>(&self) -> UniConstraintStream<A, Sc>
    where
        A: Debug + Send + Sync + 'static,
    {
        let stream = {
            let mut inner = self.inner.borrow_mut();
            match inner.source_by_type.get(&TypeId::of::<A>()) {
                Some(existing) => *existing,
                None => {
                    let id = inner.push_stream(StreamOp::Source {
                        fact_type: TypeId::of::<A>(),
                        type_name: std::any::type_name::<A>(),
                    });
                    inner.source_by_type.insert(TypeId::of::<A>(), id);
                    id
                }
            }
        };
        UniConstraintStream {
            inner: Rc::clone(&self.inner),
            stream,
            _phantom: PhantomData,
        }
    }

    // Snapshots the accumulated declarations into an immutable definition.
    pub fn build(&self) -> Arc<ConstraintSetDef<Sc>> {
        let inner = self.inner.borrow();
        Arc::new(ConstraintSetDef {
            streams: inner.streams.clone(),
            constraints: inner.constraints.clone(),
        })
    }
}

impl<Sc: Score> Default for ConstraintFactory<Sc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sc: Score> Clone for ConstraintFactory<Sc> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<Sc: Score> std::fmt::Debug for ConstraintFactory<Sc> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ConstraintFactory")
            .field("streams", &inner.streams.len())
            .field("constraints", &inner.constraints.len())
            .finish()
    }
}
