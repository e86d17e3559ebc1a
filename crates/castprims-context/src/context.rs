use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::container::{ListContext, MapContext, NestedContext, StringBufferContext};
#[cfg(feature = "async")]
use crate::queue::AsyncQueueContext;
use crate::queue::QueueContext;

/// Shared, type-erased handle to a context container.
pub type ContextRef = Arc<dyn Context>;

/// Container variants a scope can declare.
///
/// The set depends on enabled features, so matches need a wildcard arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContextKind {
    List,
    Mapping,
    Queue,
    #[cfg(feature = "async")]
    AsyncQueue,
    StringBuffer,
    /// Mapping that exposes its enclosing context under `"_"`.
    #[default]
    Nested,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::List => "list",
            ContextKind::Mapping => "mapping",
            ContextKind::Queue => "queue",
            #[cfg(feature = "async")]
            ContextKind::AsyncQueue => "async queue",
            ContextKind::StringBuffer => "string buffer",
            ContextKind::Nested => "nested mapping",
        };
        f.write_str(name)
    }
}

#[doc(hidden)]
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Capability shared by every context container.
///
/// Containers use interior mutability so one context can be shared by all
/// the scopes that resolve to it.
pub trait Context: AsAny + fmt::Debug {
    fn kind(&self) -> ContextKind;

    /// Number of stored items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all stored items.
    fn clear(&self);

    /// Point-in-time copy of the contents.
    fn snapshot(&self) -> Value;

    /// Called once when this context is created beneath `supercontext`.
    fn bind_supercontext(&self, _supercontext: &ContextRef) {}
}

/// Recover the concrete container behind a [`ContextRef`].
pub fn downcast<C: Context>(context: &ContextRef) -> Option<Arc<C>> {
    Arc::clone(context).into_any().downcast::<C>().ok()
}

/// How to build a scope's context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSpec {
    pub kind: ContextKind,
    /// Queue capacity; `0` means unbounded. Ignored by other kinds.
    pub capacity: usize,
    /// Initial contents: an array for lists and queues, an object for
    /// mappings, a string for string buffers.
    pub initial: Option<Value>,
}

impl ContextSpec {
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_initial(mut self, initial: Value) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Build a fresh, empty-or-seeded container.
    ///
    /// Initial values of the wrong shape are ignored. A bounded queue keeps
    /// only as many leading seed values as it has capacity for; the rest are
    /// dropped with a warning.
    pub fn create(&self) -> ContextRef {
        let initial = self.initial.clone();
        match self.kind {
            ContextKind::List => Arc::new(ListContext::from_values(array(initial))),
            ContextKind::Mapping => Arc::new(MapContext::from_map(object(initial))),
            ContextKind::Queue => {
                let queue = QueueContext::new(self.capacity);
                seed_queue(self, array(initial), |value| queue.try_put(value).is_ok());
                Arc::new(queue)
            }
            #[cfg(feature = "async")]
            ContextKind::AsyncQueue => {
                let queue = AsyncQueueContext::new(self.capacity);
                seed_queue(self, array(initial), |value| queue.try_put(value).is_ok());
                Arc::new(queue)
            }
            ContextKind::StringBuffer => {
                let text = match initial {
                    Some(Value::String(text)) => text,
                    _ => String::new(),
                };
                Arc::new(StringBufferContext::new(&text))
            }
            ContextKind::Nested => Arc::new(NestedContext::from_map(object(initial))),
        }
    }
}

// Feeds `values` in order until `put` refuses one. Returns how many were
// dropped.
fn seed_queue(spec: &ContextSpec, values: Vec<Value>, mut put: impl FnMut(Value) -> bool) -> usize {
    let total = values.len();
    let seeded = values.into_iter().take_while(|value| put(value.clone())).count();
    let dropped = total - seeded;
    if dropped > 0 {
        warn!(
            kind = %spec.kind,
            capacity = spec.capacity,
            seeded,
            dropped,
            "initial values exceed queue capacity, dropping the excess"
        );
    }
    dropped
}

fn array(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn object(value: Option<Value>) -> serde_json::Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}
