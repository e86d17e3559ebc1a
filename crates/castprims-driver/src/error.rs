use castprims_context::ScopeError;
use castprims_types::{ConstraintError, TypeError};

/// Errors that can occur while defining drivers or casting values.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A driver with this name is already defined in the registry.
    #[error("{0:?} driver has already been defined")]
    DuplicateDriver(String),

    /// No codec can encode the requested shape.
    #[error("no codec supports {shape}")]
    UnsupportedType { shape: String },

    /// The driver has no implementation for the requested type.
    #[error("{ty} is not supported by the {driver} driver")]
    NotImplemented { driver: String, ty: String },

    /// The value violates its type's bounds.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The type descriptor could not be built.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// Scope or context failure.
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),

    /// An I/O error occurred while reading or writing encoded bytes.
    #[error("cast I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The value is of the wrong kind for the codec.
    #[error("expected {expected} value, got {found}")]
    ValueKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Adapter configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The codec rejected the value.
    #[error("codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
