use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{const_mutex, Mutex};
use tracing::trace;

use crate::error::{Result, ScopeError};
use crate::scope::{Scope, ScopeNode};

type Factory<D> = Box<dyn Fn(&Scope) -> D + Send + Sync>;

/// A dependent declared before the thing it depends on exists.
///
/// The placeholder is bound once with [`ForwardDependency::dependency`] and
/// resolved lazily, once per owner scope. The factory always receives the
/// owner, so the dependent can compose itself through the owner's context.
///
/// ```
/// use castprims_context::{ForwardDependency, ScopeType};
///
/// static LENGTH: ForwardDependency<u32> = ForwardDependency::new("length");
///
/// LENGTH.dependency(|_owner| 4).unwrap();
/// let owner = ScopeType::builder("record").build().unwrap().instantiate(None).unwrap();
/// assert_eq!(*LENGTH.get(&owner).unwrap(), 4);
/// ```
pub struct ForwardDependency<D> {
    name: &'static str,
    factory: OnceLock<Factory<D>>,
    instances: Mutex<BTreeMap<u64, (Weak<ScopeNode>, Arc<D>)>>,
}

impl<D> ForwardDependency<D> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            factory: OnceLock::new(),
            instances: const_mutex(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_bound(&self) -> bool {
        self.factory.get().is_some()
    }

    /// Bind the factory. Only the first call succeeds.
    pub fn dependency(&self, factory: impl Fn(&Scope) -> D + Send + Sync + 'static) -> Result<()> {
        self.factory
            .set(Box::new(factory))
            .map_err(|_| ScopeError::DependencyAlreadyBound { name: self.name })
    }

    /// The dependent instance for `owner`, built on first access.
    pub fn get(&self, owner: &Scope) -> Result<Arc<D>> {
        let factory = self
            .factory
            .get()
            .ok_or(ScopeError::DependencyNotBound { name: self.name })?;

        if let Some((_, instance)) = self.instances.lock().get(&owner.id()) {
            return Ok(Arc::clone(instance));
        }

        // Built outside the lock so the factory may resolve other placeholders.
        let built = Arc::new(factory(owner));
        trace!(dependency = self.name, owner = owner.id(), "resolved forward dependency");

        let mut instances = self.instances.lock();
        instances.retain(|_, (node, _)| node.strong_count() > 0);
        let (_, instance) = instances
            .entry(owner.id())
            .or_insert_with(|| (owner.downgrade(), built));
        Ok(Arc::clone(instance))
    }
}

impl<D> fmt::Debug for ForwardDependency<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardDependency")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .field("instances", &self.instances.lock().len())
            .finish()
    }
}
