use std::fmt;
use std::sync::Arc;

use castprims_context::ContextRef;
use castprims_types::ConstraintPolicy;
use serde::{Deserialize, Serialize};

use crate::codec::{ByteOrder, CodecRef};
use crate::error::Result;

type DeferredFn = Arc<dyn Fn(Option<&ContextRef>) -> bool + Send + Sync>;

/// An endianness switch, either fixed or decided per call from the shared
/// context.
#[derive(Clone)]
pub enum EndianFlag {
    Plain(bool),
    Deferred(DeferredFn),
}

impl EndianFlag {
    pub fn deferred(f: impl Fn(Option<&ContextRef>) -> bool + Send + Sync + 'static) -> Self {
        EndianFlag::Deferred(Arc::new(f))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, EndianFlag::Deferred(_))
    }

    pub fn evaluate(&self, context: Option<&ContextRef>) -> bool {
        match self {
            EndianFlag::Plain(value) => *value,
            EndianFlag::Deferred(f) => f(context),
        }
    }
}

impl From<bool> for EndianFlag {
    fn from(value: bool) -> Self {
        EndianFlag::Plain(value)
    }
}

impl fmt::Debug for EndianFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndianFlag::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            EndianFlag::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// The `big`, `little` and `native` switches of an adapter.
///
/// Priority is big > little > native. With nothing set, or nothing
/// evaluating true, the order is big-endian, except that an explicit `big`
/// flag evaluating false selects little-endian.
#[derive(Debug, Clone, Default)]
pub struct EndianFlags {
    pub big: Option<EndianFlag>,
    pub little: Option<EndianFlag>,
    pub native: Option<EndianFlag>,
}

impl EndianFlags {
    fn iter(&self) -> impl Iterator<Item = &EndianFlag> {
        [&self.big, &self.little, &self.native]
            .into_iter()
            .flatten()
    }

    /// Number of flags given.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn any_deferred(&self) -> bool {
        self.iter().any(EndianFlag::is_deferred)
    }

    /// Byte order for one call.
    pub fn resolve(&self, context: Option<&ContextRef>) -> ByteOrder {
        let set = |flag: &Option<EndianFlag>| flag.as_ref().is_some_and(|f| f.evaluate(context));
        if set(&self.big) {
            ByteOrder::Big
        } else if set(&self.little) {
            ByteOrder::Little
        } else if set(&self.native) {
            ByteOrder::Native
        } else if self.big.is_some() {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Byte order known without a context, `None` if any flag is deferred.
    pub fn resolve_static(&self) -> Option<ByteOrder> {
        (!self.any_deferred()).then(|| self.resolve(None))
    }
}

/// Settings of a number adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Explicit codec; skips codec selection entirely.
    pub codec: Option<CodecRef>,
    pub endian: EndianFlags,
    /// Prefer a fixed-size native codec when one matches. Ignored when any
    /// endianness flag is deferred.
    pub cpu_sized: bool,
    pub policy: ConstraintPolicy,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            codec: None,
            endian: EndianFlags::default(),
            cpu_sized: true,
            policy: ConstraintPolicy::Strict,
        }
    }
}

impl AdapterSettings {
    pub fn with_codec(mut self, codec: CodecRef) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn big(mut self, flag: impl Into<EndianFlag>) -> Self {
        self.endian.big = Some(flag.into());
        self
    }

    pub fn little(mut self, flag: impl Into<EndianFlag>) -> Self {
        self.endian.little = Some(flag.into());
        self
    }

    pub fn native(mut self, flag: impl Into<EndianFlag>) -> Self {
        self.endian.native = Some(flag.into());
        self
    }

    pub fn cpu_sized(mut self, cpu_sized: bool) -> Self {
        self.cpu_sized = cpu_sized;
        self
    }

    pub fn policy(mut self, policy: ConstraintPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Constraint policy names accepted in [`AdapterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyName {
    Strict,
    Reshape,
    Ignore,
}

impl From<PolicyName> for ConstraintPolicy {
    fn from(name: PolicyName) -> Self {
        match name {
            PolicyName::Strict => ConstraintPolicy::Strict,
            PolicyName::Reshape => ConstraintPolicy::Reshape,
            PolicyName::Ignore => ConstraintPolicy::Ignore,
        }
    }
}

/// Plain-data form of [`AdapterSettings`], e.g. read from a JSON file.
///
/// Codecs and deferred flags cannot be expressed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    pub big: Option<bool>,
    pub little: Option<bool>,
    pub native: Option<bool>,
    pub cpu_sized: Option<bool>,
    pub policy: Option<PolicyName>,
}

impl AdapterConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<AdapterConfig> for AdapterSettings {
    fn from(config: AdapterConfig) -> Self {
        let defaults = AdapterSettings::default();
        AdapterSettings {
            codec: None,
            endian: EndianFlags {
                big: config.big.map(EndianFlag::Plain),
                little: config.little.map(EndianFlag::Plain),
                native: config.native.map(EndianFlag::Plain),
            },
            cpu_sized: config.cpu_sized.unwrap_or(defaults.cpu_sized),
            policy: config.policy.map_or(defaults.policy, ConstraintPolicy::from),
        }
    }
}
