/// Errors raised while building type descriptors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Integers are at least one bit wide.
    #[error("integer width must be at least 1 bit or unbounded")]
    ZeroWidth,

    /// Floats exist only in IEEE widths.
    #[error("unsupported float width {bits} (expected 16, 32 or 64)")]
    UnsupportedFloatWidth { bits: u32 },

    /// Floats always have a finite width.
    #[error("floats cannot be unbounded")]
    UnboundedFloat,
}

/// A load-time or dump-time constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    /// The value lies outside the descriptor's bounds.
    ///
    /// All three fields are already truncated for display.
    #[error("loaded object {value} is out of bounds [{min}, {max}]")]
    OutOfBounds {
        value: String,
        min: String,
        max: String,
    },
}

pub type Result<T> = std::result::Result<T, TypeError>;
