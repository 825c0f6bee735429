//! Replayable property accessors.
//!
//! Resolving `a.b[0].c()` against a root object means deciding, at every
//! segment, *how* to get from the current value to the next one: a host
//! getter, a map lookup, a list index, a static field, a method call. Those
//! decisions depend on the runtime shape of each intermediate value.
//!
//! An [`Accessor`] records the decisions made on one resolution so the next
//! evaluation can replay them without deciding again. Every recorded step
//! remembers the shape it was built for and reports [`Replay::Stale`] when a
//! replay meets a different shape; the owning node then drops the accessor
//! and builds a fresh one. Staleness is never surfaced to the caller.
//!
//! The decision logic lives in [`resolve`] and is shared by the interpreted
//! path (decide and apply every time) and the optimizer (decide once, record,
//! replay later), so the two paths cannot disagree.

mod error;
mod optimizer;
pub mod resolve;

#[cfg(test)]
mod accessor_test;

use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use parking_lot::{Mutex, MutexGuard, RwLock};

pub use error::{PropertyAccessError, PropertyAccessErrorKind};
pub use optimizer::{AccessorOptimizer, ReflectiveAccessorOptimizer};

use crate::evaluator::{Control, EvalError, EvalErrorKind};
use crate::stdlib::Intrinsic;
use crate::values::{Class, ClassId};

/// How the first value of a path is obtained.
#[derive(Debug, Clone)]
pub enum RootStep {
    This,
    Variable(EcoString),
    Indexed(usize),
    /// Property of the root object.
    ThisProperty { class: ClassId, name: EcoString },
    /// Key of a root object that is a map.
    ThisMapKey(EcoString),
    /// Call of a method of the root object.
    ThisMethod { class: ClassId, name: EcoString },
    /// Call of a function stored in a variable.
    CallFunction(EcoString),
    /// A class resolved through imports or a fully qualified name. `name`
    /// is the root identifier that selected it; a replay goes stale once a
    /// variable or root member of that name appears. Constructors have none.
    Class { class: Arc<Class>, name: Option<EcoString> },
    /// An arbitrary root expression; nothing to check.
    Expression,
}

/// One recorded hop.
#[derive(Debug, Clone)]
pub enum Step {
    Property { class: ClassId, name: EcoString },
    MapKey(EcoString),
    ArrayLength,
    ListIndex,
    ArrayIndex,
    MapIndex,
    StrIndex,
    Method { class: ClassId, name: EcoString },
    Intrinsic(Intrinsic),
    StaticField { class: ClassId, name: EcoString },
    StaticMethod { class: ClassId, name: EcoString },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Property { .. } => "property",
            Step::MapKey(_) => "map key",
            Step::ArrayLength => "array length",
            Step::ListIndex => "list index",
            Step::ArrayIndex => "array index",
            Step::MapIndex => "map index",
            Step::StrIndex => "string index",
            Step::Method { .. } => "method",
            Step::Intrinsic(_) => "intrinsic",
            Step::StaticField { .. } => "static field",
            Step::StaticMethod { .. } => "static method",
        }
    }
}

/// The input a step consumes besides the current value.
#[derive(Debug, Clone, Copy)]
pub enum StepInput<'a> {
    None,
    Index(&'a crate::values::Value),
    Args(&'a [crate::values::Value]),
}

/// An evaluated step input, kept so a de-optimized path can continue
/// without evaluating index or argument expressions a second time.
#[derive(Debug, Clone)]
pub enum SegmentInput {
    None,
    Index(crate::values::Value),
    Args(Vec<crate::values::Value>),
}

impl SegmentInput {
    pub fn as_step_input(&self) -> StepInput<'_> {
        match self {
            SegmentInput::None => StepInput::None,
            SegmentInput::Index(index) => StepInput::Index(index),
            SegmentInput::Args(args) => StepInput::Args(args),
        }
    }
}

/// Where a stale replay stopped, with everything it had evaluated so far.
///
/// Resolution resumes from this point, so the side effects of root
/// arguments, indices and method arguments happen once per evaluation
/// whether or not the cached accessor held.
#[derive(Debug)]
pub enum Resume {
    /// Nothing observable ran yet.
    Restart,
    /// The arguments of a root call were evaluated, the call was not made.
    RootCall { args: Vec<crate::values::Value> },
    /// Segment `at` could not be replayed against `value`. `accessor` holds
    /// the root and the steps that still applied; `input` is the segment's
    /// input when it was already evaluated.
    Segment {
        accessor: Accessor,
        value: crate::values::Value,
        at: usize,
        input: Option<SegmentInput>,
    },
}

/// Outcome of a failed replay.
pub enum Replay {
    /// The value no longer has the shape the step was built for.
    Stale(&'static str),
    /// The step applied and failed; the error is the caller's.
    Failed(Control),
}

impl From<Control> for Replay {
    fn from(control: Control) -> Self {
        Replay::Failed(control)
    }
}

impl From<EvalError> for Replay {
    fn from(err: EvalError) -> Self {
        Replay::Failed(err.into())
    }
}

impl From<EvalErrorKind> for Replay {
    fn from(kind: EvalErrorKind) -> Self {
        Replay::Failed(EvalError::from(kind).into())
    }
}

impl From<PropertyAccessError> for Replay {
    fn from(err: PropertyAccessError) -> Self {
        Replay::from(EvalErrorKind::PropertyAccess(err))
    }
}

/// A resolved path: a root step, the number of leading segments consumed
/// by the root (static class scans), and one step per remaining segment.
///
/// `steps` may be shorter than the path when the recorded resolution
/// stopped early at a null-safe hop.
#[derive(Debug, Clone)]
pub struct Accessor {
    pub root: RootStep,
    pub skip: usize,
    pub steps: Vec<Step>,
}

impl Accessor {
    pub fn new(root: RootStep) -> Self {
        Self {
            root,
            skip: 0,
            steps: Vec::new(),
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.root)?;
        for step in &self.steps {
            write!(f, " -> {}", step.name())?;
        }
        Ok(())
    }
}

/// Per-node cache slot for an [`Accessor`].
///
/// Reads are not lock-free: every hit takes the slot's shared read lock,
/// which is uncontended unless a rebuild is publishing. A miss or a stale
/// replay rebuilds under a per-node guard. A caller that finds the guard
/// taken (another thread, or a recursive evaluation of the same node)
/// resolves without the cache instead of waiting.
#[derive(Default)]
pub struct AccessorCache {
    slot: RwLock<Option<Arc<Accessor>>>,
    rebuild: Mutex<()>,
}

impl AccessorCache {
    pub fn get(&self) -> Option<Arc<Accessor>> {
        self.slot.read().clone()
    }

    pub fn is_cached(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn publish(&self, accessor: Accessor) -> Arc<Accessor> {
        let accessor = Arc::new(accessor);
        *self.slot.write() = Some(accessor.clone());
        accessor
    }

    /// Clears the slot if it still holds `stale`.
    pub fn invalidate(&self, stale: &Arc<Accessor>) {
        let mut slot = self.slot.write();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, stale)) {
            *slot = None;
        }
    }

    pub fn try_rebuild(&self) -> Option<MutexGuard<'_, ()>> {
        self.rebuild.try_lock()
    }
}

impl fmt::Debug for AccessorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.slot.read() {
            Some(accessor) => write!(f, "AccessorCache({})", accessor),
            None => write!(f, "AccessorCache(empty)"),
        }
    }
}
