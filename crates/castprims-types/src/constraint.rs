use tracing::debug;

use crate::descriptor::{Bound, Bounds};
use crate::error::ConstraintError;
use crate::integer::Integer;

/// Width that bounds and values are truncated to in error messages.
pub const TRUNCATE_WIDTH: usize = 20;

const PLACEHOLDER: &str = "...";

/// What to do with a value that violates its bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConstraintPolicy {
    /// Reject out-of-range values.
    #[default]
    Strict,
    /// Clamp out-of-range values to the nearest finite bound.
    Reshape,
    /// Pass every value through unchanged.
    Ignore,
}

/// Inclusive range check over an integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConstraint {
    bounds: Bounds,
    policy: ConstraintPolicy,
    min_text: String,
    max_text: String,
}

impl RangeConstraint {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            policy: ConstraintPolicy::default(),
            min_text: truncate(&bounds.min.to_string(), TRUNCATE_WIDTH),
            max_text: truncate(&bounds.max.to_string(), TRUNCATE_WIDTH),
            bounds,
        }
    }

    /// Same bounds, different policy.
    pub fn with_policy(&self, policy: ConstraintPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn policy(&self) -> ConstraintPolicy {
        self.policy
    }

    /// Check `value` against the bounds and apply the policy.
    ///
    /// Under [`ConstraintPolicy::Reshape`] a value beyond an infinite bound
    /// cannot happen; a value beyond a finite bound becomes that bound.
    pub fn validate(&self, value: Integer) -> Result<Integer, ConstraintError> {
        if self.policy == ConstraintPolicy::Ignore || self.bounds.contains(&value) {
            return Ok(value);
        }

        if self.policy == ConstraintPolicy::Reshape {
            let clamped = match (&self.bounds.min, &self.bounds.max) {
                (Bound::Finite(min), _) if &value < min => min.clone(),
                (_, Bound::Finite(max)) if &value > max => max.clone(),
                _ => return Ok(value),
            };
            debug!(%value, %clamped, "reshaped out-of-range value");
            return Ok(clamped);
        }

        Err(ConstraintError::OutOfBounds {
            value: truncate(&value.to_string(), TRUNCATE_WIDTH),
            min: self.min_text.clone(),
            max: self.max_text.clone(),
        })
    }
}

/// Shorten `text` to at most `width` characters by eliding its middle.
///
/// The head keeps one more character than the tail when the kept length is
/// odd, e.g. `truncate("340282366920938463463374607431768211455", 20)` is
/// `"340282366...68211455"`.
pub fn truncate(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= width {
        return text.to_string();
    }

    let keep = width.saturating_sub(PLACEHOLDER.len());
    let head = (keep / 2 + 1).min(keep);
    let tail = keep - head;

    let mut out: String = chars[..head].iter().collect();
    out.push_str(PLACEHOLDER);
    out.extend(&chars[len - tail..]);
    out
}
