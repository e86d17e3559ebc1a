//! Scope tree and shared per-scope context.
//!
//! Serializers for a tree of fields often need state that spans fields: a
//! length read earlier, a running offset, a counter. Every node of the tree
//! is a [`Scope`], and every scope resolves to a [`Context`] container:
//! - a root scope always gets a fresh context
//! - a child either shares its descent's context or forks its own beneath it
//! - the forked context remembers the one above it as its supercontext
//!
//! Contexts are created lazily on first access and live as long as the
//! scopes that reference them.

pub mod container;
pub mod context;
pub mod dependency;
pub mod error;
pub mod queue;
pub mod scope;

pub use container::{ListContext, MapContext, NestedContext, Slot, StringBufferContext, PARENT_KEY};
pub use context::{downcast, Context, ContextKind, ContextRef, ContextSpec};
pub use dependency::ForwardDependency;
pub use error::{Result, ScopeError};
#[cfg(feature = "async")]
pub use queue::AsyncQueueContext;
pub use queue::QueueContext;
pub use scope::{NewContext, Scope, ScopeState, ScopeType, ScopeTypeBuilder};
