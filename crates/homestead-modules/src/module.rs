//! The module contract and the factory registry.
//!
//! A module is any type implementing [`Module`]. The host never names module
//! types directly: it maps load references from the configuration file to
//! [`ModuleFactory`] trait objects in a [`ModuleFactoryRegistry`], and
//! [`ModuleType`] adapts a `Module` into a factory.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use homestead_config::{ModuleEntry, RawModuleConfig};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::api::ModuleApi;
use crate::error::{ConfigError, ConstructionError};

/// Untyped configuration block of one module.
pub type RawConfig = RawModuleConfig;

/// Identity of a configured module.
///
/// `index` is the module's position in the configuration list, so a module
/// configured twice gets two distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    index: usize,
    reference: Arc<str>,
}

impl ModuleId {
    /// Create an identity for the module at `index` loaded from `reference`.
    #[must_use]
    pub fn new(index: usize, reference: impl AsRef<str>) -> Self {
        Self {
            index,
            reference: Arc::from(reference.as_ref()),
        }
    }

    /// Position in the configuration list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Load reference, e.g. `homestead.stock.RoomPolicy`.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.reference, self.index)
    }
}

/// One entry of the ordered module list.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    /// Load reference resolved through the factory registry.
    pub reference: String,
    /// The module's own, not yet validated, configuration block.
    pub raw_config: RawConfig,
}

impl ModuleDescriptor {
    /// Create a descriptor with an empty configuration block.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            raw_config: RawConfig::new(),
        }
    }

    /// Set the configuration block from a JSON object.
    ///
    /// Non-object values leave the block empty.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = config {
            self.raw_config = map;
        }
        self
    }
}

impl From<ModuleEntry> for ModuleDescriptor {
    fn from(entry: ModuleEntry) -> Self {
        Self {
            reference: entry.module,
            raw_config: entry.config,
        }
    }
}

impl From<&ModuleEntry> for ModuleDescriptor {
    fn from(entry: &ModuleEntry) -> Self {
        Self::from(entry.clone())
    }
}

/// A module's normalized configuration, type-erased.
///
/// Produced once by [`ModuleFactory::parse_config`] and shared between the
/// loader and the module instance.
#[derive(Clone)]
pub struct ModuleConfig(Arc<dyn Any + Send + Sync>);

impl ModuleConfig {
    /// Erase a typed configuration.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(config: T) -> Self {
        Self(Arc::new(config))
    }

    /// Recover the typed configuration.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    /// Borrow the typed configuration.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig").finish_non_exhaustive()
    }
}

/// Deserialize a raw configuration block into a typed config struct.
///
/// The usual first step of a [`Module::parse_config`] implementation.
///
/// # Errors
///
/// Returns a [`ConfigError`] carrying serde's message when the block does
/// not match `T`.
pub fn parse_typed<T: DeserializeOwned>(raw: &RawConfig) -> Result<T, ConfigError> {
    Ok(serde_json::from_value(serde_json::Value::Object(raw.clone()))?)
}

/// An extension module.
///
/// Construction happens once at startup. Everything the module wants to
/// hook into is registered through the [`ModuleApi`] handed to [`Module::new`].
pub trait Module: Send + Sync + Sized + 'static {
    /// Normalized configuration.
    type Config: Send + Sync + 'static;

    /// Validate and normalize the raw configuration block. Must be pure.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] explaining why the block was rejected.
    fn parse_config(raw: &RawConfig) -> Result<Self::Config, ConfigError>;

    /// Construct the module and register its callbacks and resources.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstructionError`] if the module cannot start.
    fn new(config: Arc<Self::Config>, api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError>;
}

/// Object-safe construction interface used by the loader.
///
/// Implemented for every `Module` through [`ModuleType`]. Hosts can also
/// implement it directly for modules whose shape is decided at runtime.
pub trait ModuleFactory: Send + Sync {
    /// Validate and normalize the raw configuration block.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] explaining why the block was rejected.
    fn parse_config(&self, raw: &RawConfig) -> Result<ModuleConfig, ConfigError>;

    /// Construct an instance from a configuration produced by
    /// [`ModuleFactory::parse_config`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConstructionError`] if the module cannot start.
    fn construct(
        &self,
        config: ModuleConfig,
        api: &mut ModuleApi<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ConstructionError>;
}

/// Adapts a [`Module`] type into a [`ModuleFactory`].
pub struct ModuleType<M>(PhantomData<fn() -> M>);

impl<M> ModuleType<M> {
    /// Create the adapter.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for ModuleType<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Module> ModuleFactory for ModuleType<M> {
    fn parse_config(&self, raw: &RawConfig) -> Result<ModuleConfig, ConfigError> {
        M::parse_config(raw).map(ModuleConfig::new)
    }

    fn construct(
        &self,
        config: ModuleConfig,
        api: &mut ModuleApi<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ConstructionError> {
        let typed = config
            .downcast::<M::Config>()
            .ok_or_else(|| ConstructionError::failed("configuration has the wrong type"))?;
        let module = M::new(typed, api)?;
        Ok(Box::new(module))
    }
}

/// Maps load references to module factories.
#[derive(Default)]
pub struct ModuleFactoryRegistry {
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
}

impl ModuleFactoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`Module`] type under `reference`.
    pub fn register<M: Module>(&mut self, reference: impl Into<String>) -> &mut Self {
        self.register_factory(reference, Arc::new(ModuleType::<M>::new()))
    }

    /// Register a factory under `reference`.
    ///
    /// A second registration under the same reference replaces the first.
    pub fn register_factory(
        &mut self,
        reference: impl Into<String>,
        factory: Arc<dyn ModuleFactory>,
    ) -> &mut Self {
        let reference = reference.into();
        if self.factories.insert(reference.clone(), factory).is_some() {
            warn!(reference = %reference, "module factory replaced");
        }
        self
    }

    /// Look up the factory for `reference`.
    #[must_use]
    pub fn get(&self, reference: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories.get(reference).map(Arc::clone)
    }

    /// Whether a factory is registered under `reference`.
    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        self.factories.contains_key(reference)
    }

    /// Registered references, sorted.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        refs.sort_unstable();
        refs
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ModuleFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleFactoryRegistry")
            .field("references", &self.references())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct GreeterConfig {
        greeting: String,
    }

    struct Greeter {
        greeting: String,
    }

    impl Module for Greeter {
        type Config = GreeterConfig;

        fn parse_config(raw: &RawConfig) -> Result<Self::Config, ConfigError> {
            let config: GreeterConfig = parse_typed(raw)?;
            if config.greeting.is_empty() {
                return Err(ConfigError::new("must not be empty").at("greeting"));
            }
            Ok(config)
        }

        fn new(config: Arc<Self::Config>, _api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError> {
            Ok(Self {
                greeting: config.greeting.clone(),
            })
        }
    }

    fn raw(value: serde_json::Value) -> RawConfig {
        match value {
            serde_json::Value::Object(map) => map,
            _ => RawConfig::new(),
        }
    }

    #[test]
    fn test_module_id_display() {
        let id = ModuleId::new(3, "acme.Greeter");
        assert_eq!(id.to_string(), "acme.Greeter[3]");
        assert_eq!(id.index(), 3);
        assert_eq!(id.reference(), "acme.Greeter");
        assert_ne!(id, ModuleId::new(4, "acme.Greeter"));
    }

    #[test]
    fn test_descriptor_from_entry() {
        let entry = ModuleEntry::new("acme.Greeter").with_config(json!({ "greeting": "hi" }));
        let descriptor = ModuleDescriptor::from(&entry);
        assert_eq!(descriptor.reference, "acme.Greeter");
        assert_eq!(descriptor.raw_config.get("greeting"), Some(&json!("hi")));
    }

    #[test]
    fn test_module_config_downcast() {
        let config = ModuleConfig::new(42_u32);
        assert_eq!(config.downcast::<u32>().as_deref(), Some(&42));
        assert!(config.downcast::<String>().is_none());
        assert_eq!(config.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_module_type_parse_config() {
        let factory = ModuleType::<Greeter>::new();
        let config = factory.parse_config(&raw(json!({ "greeting": "hello" }))).unwrap();
        assert_eq!(config.downcast_ref::<GreeterConfig>().unwrap().greeting, "hello");

        let err = factory.parse_config(&raw(json!({ "greeting": "" }))).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("greeting"));

        let err = factory.parse_config(&raw(json!({}))).unwrap_err();
        assert!(err.reason.contains("greeting"));
    }

    #[test]
    fn test_module_type_construct() {
        let mut hooks = crate::hooks::HookRegistry::new();
        let mut resources = crate::resource::ResourceRegistry::new();
        let mut api = ModuleApi::new(ModuleId::new(0, "acme.Greeter"), &mut hooks, &mut resources);

        let factory = ModuleType::<Greeter>::new();
        let config = factory.parse_config(&raw(json!({ "greeting": "hey" }))).unwrap();
        let instance = factory.construct(config, &mut api).unwrap();
        assert_eq!(instance.downcast_ref::<Greeter>().unwrap().greeting, "hey");

        let wrong = ModuleConfig::new(1_u8);
        assert!(matches!(
            factory.construct(wrong, &mut api),
            Err(ConstructionError::Failed { .. })
        ));
    }

    #[test]
    fn test_factory_registry() {
        let mut registry = ModuleFactoryRegistry::new();
        assert!(registry.is_empty());
        registry
            .register::<Greeter>("acme.Greeter")
            .register::<Greeter>("acme.Alias");

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("acme.Greeter"));
        assert!(registry.get("acme.Missing").is_none());
        assert_eq!(registry.references(), ["acme.Alias", "acme.Greeter"]);

        registry.register::<Greeter>("acme.Greeter");
        assert_eq!(registry.len(), 2);
    }
}
