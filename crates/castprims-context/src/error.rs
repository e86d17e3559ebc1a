use crate::context::ContextKind;

/// Errors that can occur while building scopes or using their contexts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// A scope that shares its descent's context declares a different
    /// container kind.
    #[error("scope {scope} declares a {declared} context but its descent provides a {inherited} context")]
    ContextKindConflict {
        scope: String,
        declared: ContextKind,
        inherited: ContextKind,
    },

    /// The descent passed at construction is not of the declared type.
    #[error("scope {scope} expects a descent of type {expected}, got {found}")]
    DescentTypeMismatch {
        scope: String,
        expected: String,
        found: String,
    },

    /// `dependency()` was called twice on the same placeholder.
    #[error("forward dependency {name} is already bound")]
    DependencyAlreadyBound { name: &'static str },

    /// The placeholder was accessed before `dependency()` bound it.
    #[error("forward dependency {name} is not bound")]
    DependencyNotBound { name: &'static str },

    /// The key is reserved by the container.
    #[error("key {0:?} is reserved")]
    ReservedKey(String),

    /// The queue was closed while waiting on it.
    #[error("queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, ScopeError>;
