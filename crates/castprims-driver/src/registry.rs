use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use castprims_types::{alias, NumberType};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::cast::Serializer;
use crate::config::AdapterSettings;
use crate::error::{DriverError, Result};

/// Expands to the path of the calling module, the conventional driver name.
#[macro_export]
macro_rules! driver_name {
    () => {
        module_path!()
    };
}

/// What an implementation stands in for.
#[derive(Debug, Clone, Copy)]
pub enum AbstractType {
    /// A number descriptor; compared by identity.
    Number(&'static NumberType),
    /// Any other abstract type, by name.
    Named(&'static str),
}

impl PartialEq for AbstractType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AbstractType::Number(a), AbstractType::Number(b)) => std::ptr::eq(*a, *b),
            (AbstractType::Named(a), AbstractType::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AbstractType {}

impl Hash for AbstractType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AbstractType::Number(ty) => {
                0u8.hash(state);
                std::ptr::hash(*ty, state);
            }
            AbstractType::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractType::Number(ty) => fmt::Display::fmt(ty, f),
            AbstractType::Named(name) => f.write_str(name),
        }
    }
}

impl From<&'static NumberType> for AbstractType {
    fn from(ty: &'static NumberType) -> Self {
        AbstractType::Number(ty)
    }
}

/// A driver's concrete serializer factory for one abstract type.
pub trait Implementation: Send + Sync {
    /// The abstract type this implementation is filed under by default.
    fn origin(&self) -> AbstractType;

    /// Name the driver resolves it by.
    fn name(&self) -> String {
        self.origin().to_string()
    }

    fn instantiate(&self, settings: &AdapterSettings) -> Result<Box<dyn Serializer>>;
}

/// Result of a driver lookup. Lookups never fail.
#[derive(Clone)]
pub enum Lookup {
    Found(Arc<dyn Implementation>),
    NotImplemented,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn implementation(&self) -> Option<&Arc<dyn Implementation>> {
        match self {
            Lookup::Found(implementation) => Some(implementation),
            Lookup::NotImplemented => None,
        }
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Found(implementation) => f.debug_tuple("Found").field(&implementation.name()).finish(),
            Lookup::NotImplemented => f.write_str("NotImplemented"),
        }
    }
}

/// Schema-layer type that knows how to build its serializer from a driver.
pub trait Model {
    fn resolve_serializer(&self, driver: &Driver, settings: &AdapterSettings) -> Result<Box<dyn Serializer>>;
}

/// Bare description of a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub name: String,
    /// Registered origins, in registration order.
    pub origins: Vec<String>,
}

/// A named mapping from abstract types to implementations.
pub struct Driver {
    name: String,
    implementations: HashMap<AbstractType, Arc<dyn Implementation>>,
    order: Vec<AbstractType>,
    names: HashMap<String, AbstractType>,
}

impl Driver {
    pub fn builder(name: impl Into<String>) -> DriverBuilder {
        DriverBuilder {
            driver: Driver {
                name: name.into(),
                implementations: HashMap::new(),
                order: Vec::new(),
                names: HashMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, ty: &AbstractType) -> Lookup {
        match self.implementations.get(ty) {
            Some(implementation) => Lookup::Found(Arc::clone(implementation)),
            None => Lookup::NotImplemented,
        }
    }

    /// Look up by name: this driver's own implementation names first, then
    /// the standard alias table.
    pub fn resolve(&self, name: &str) -> Lookup {
        if let Some(ty) = self.names.get(name) {
            return self.lookup(ty);
        }
        match alias(name) {
            Some(ty) => self.lookup(&AbstractType::Number(ty)),
            None => Lookup::NotImplemented,
        }
    }

    /// Build a serializer for `ty` with `settings`.
    pub fn instantiate(&self, ty: &AbstractType, settings: &AdapterSettings) -> Result<Box<dyn Serializer>> {
        match self.lookup(ty) {
            Lookup::Found(implementation) => implementation.instantiate(settings),
            Lookup::NotImplemented => Err(DriverError::NotImplemented {
                driver: self.name.clone(),
                ty: ty.to_string(),
            }),
        }
    }

    /// Ask `model` for its serializer under this driver.
    pub fn serializer_for(&self, model: &dyn Model, settings: &AdapterSettings) -> Result<Box<dyn Serializer>> {
        model.resolve_serializer(self, settings)
    }

    /// [`Driver::serializer_for`] on a default-constructed model.
    pub fn serializer_for_type<M: Model + Default>(&self, settings: &AdapterSettings) -> Result<Box<dyn Serializer>> {
        self.serializer_for(&M::default(), settings)
    }

    pub fn introspect(&self) -> DriverInfo {
        DriverInfo {
            name: self.name.clone(),
            origins: self.order.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("name", &self.name)
            .field("origins", &self.order)
            .finish()
    }
}

/// Collects a driver's implementations before it is defined.
pub struct DriverBuilder {
    driver: Driver,
}

impl DriverBuilder {
    /// File `implementation` under its own origin.
    pub fn register(self, implementation: impl Implementation + 'static) -> Self {
        let origin = implementation.origin();
        self.register_as(origin, implementation)
    }

    /// File `implementation` under an explicit origin. A later registration
    /// for the same origin replaces the earlier one.
    pub fn register_as(mut self, origin: AbstractType, implementation: impl Implementation + 'static) -> Self {
        let name = implementation.name();
        let previous = self.driver.implementations.insert(origin, Arc::new(implementation));
        if previous.is_none() {
            self.driver.order.push(origin);
        }
        self.driver.names.insert(name, origin);
        self
    }

    pub fn build(self) -> Driver {
        self.driver
    }

    /// Build and define in `registry`.
    pub fn define(self, registry: &DriverRegistry) -> Result<Arc<Driver>> {
        registry.define(self.build())
    }
}

static GLOBAL: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::new);

/// Name-keyed set of defined drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<Driver>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static DriverRegistry {
        &GLOBAL
    }

    /// Add `driver`. Names are unique per registry.
    pub fn define(&self, driver: Driver) -> Result<Arc<Driver>> {
        let mut drivers = self.drivers.write();
        if drivers.contains_key(&driver.name) {
            return Err(DriverError::DuplicateDriver(driver.name));
        }

        debug!(driver = %driver.name, implementations = driver.order.len(), "defined driver");
        let driver = Arc::new(driver);
        drivers.insert(driver.name.clone(), Arc::clone(&driver));
        Ok(driver)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Driver>> {
        self.drivers.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.read().contains_key(name)
    }

    /// Defined driver names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
