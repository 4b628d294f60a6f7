//! Startup: turn the ordered module list into a running [`ModuleHost`].

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use homestead_config::{ConstructionFailurePolicy, DispatchSection, ModuleEntry};
use homestead_core::HookCategory;
use tracing::{error, info, warn};

use crate::api::ModuleApi;
use crate::dispatch::{Dispatcher, panic_message};
use crate::error::{ConstructionError, StartupError, StartupResult};
use crate::hooks::{BindingInfo, FailureMode, HookRegistry};
use crate::module::{ModuleConfig, ModuleDescriptor, ModuleFactoryRegistry, ModuleId};
use crate::observability::{FailureReporter, TracingReporter};
use crate::resource::{RESERVED_PREFIX, ResourceHandler, ResourceRegistry};

/// What startup does when a module constructor fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConstructionFailure {
    /// Refuse to start.
    #[default]
    Abort,
    /// Drop the module and everything it registered, then keep going.
    SkipModule,
}

impl From<ConstructionFailurePolicy> for ConstructionFailure {
    fn from(policy: ConstructionFailurePolicy) -> Self {
        match policy {
            ConstructionFailurePolicy::Abort => Self::Abort,
            ConstructionFailurePolicy::Skip => Self::SkipModule,
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Constructor failure handling.
    pub construction_failure: ConstructionFailure,
    /// Callback failure handling for authorization hooks.
    pub failure_mode: FailureMode,
    /// Path prefix modules may not register resources under.
    pub reserved_prefix: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            construction_failure: ConstructionFailure::default(),
            failure_mode: FailureMode::default(),
            reserved_prefix: RESERVED_PREFIX.to_string(),
        }
    }
}

impl From<&DispatchSection> for LoaderOptions {
    fn from(section: &DispatchSection) -> Self {
        Self {
            construction_failure: section.on_construction_failure.into(),
            failure_mode: section.on_callback_failure.into(),
            ..Self::default()
        }
    }
}

/// A constructed module.
pub struct ModuleInstance {
    id: ModuleId,
    config: ModuleConfig,
    instance: Box<dyn Any + Send + Sync>,
}

impl ModuleInstance {
    /// The module's identity.
    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// The normalized configuration the module was built from.
    #[must_use]
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Borrow the instance as its concrete type.
    #[must_use]
    pub fn downcast_ref<M: Any>(&self) -> Option<&M> {
        self.instance.downcast_ref::<M>()
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A module dropped at startup under [`ConstructionFailure::SkipModule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModule {
    /// The dropped module.
    pub id: ModuleId,
    /// Why its constructor failed.
    pub error: ConstructionError,
}

/// Builds a [`ModuleHost`] from module descriptors.
pub struct ModuleLoader {
    factories: ModuleFactoryRegistry,
    options: LoaderOptions,
    reporter: Arc<dyn FailureReporter>,
}

impl ModuleLoader {
    /// Create a loader resolving references through `factories`.
    #[must_use]
    pub fn new(factories: ModuleFactoryRegistry) -> Self {
        Self {
            factories,
            options: LoaderOptions::default(),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replace the loader options.
    #[must_use]
    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the reporter the built host's dispatcher uses.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The loader options.
    #[must_use]
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// The factory registry.
    #[must_use]
    pub fn factories(&self) -> &ModuleFactoryRegistry {
        &self.factories
    }

    /// Load the modules of a configuration file's module list.
    ///
    /// # Errors
    ///
    /// See [`ModuleLoader::load`].
    pub fn load_entries(&self, entries: &[ModuleEntry]) -> StartupResult<ModuleHost> {
        self.load(entries.iter().map(ModuleDescriptor::from))
    }

    /// Resolve, configure and construct every module, in order.
    ///
    /// # Errors
    ///
    /// - [`StartupError::UnknownModule`] if a reference has no factory
    /// - [`StartupError::Config`] if a module rejects its configuration
    /// - [`StartupError::Construction`] if a constructor fails and the loader
    ///   aborts on construction failure
    pub fn load(
        &self,
        descriptors: impl IntoIterator<Item = ModuleDescriptor>,
    ) -> StartupResult<ModuleHost> {
        let mut hooks = HookRegistry::new();
        let mut resources = ResourceRegistry::with_reserved_prefix(&self.options.reserved_prefix);
        let mut modules = Vec::new();
        let mut skipped = Vec::new();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let id = ModuleId::new(index, &descriptor.reference);

            let Some(factory) = self.factories.get(&descriptor.reference) else {
                error!(module = %id, "no factory registered for module");
                return Err(StartupError::UnknownModule { module: id });
            };

            let config = factory
                .parse_config(&descriptor.raw_config)
                .map_err(|source| {
                    error!(module = %id, error = %source, "module configuration rejected");
                    StartupError::Config {
                        module: id.clone(),
                        source,
                    }
                })?;

            let constructed = {
                let mut api = ModuleApi::new(id.clone(), &mut hooks, &mut resources);
                std::panic::catch_unwind(AssertUnwindSafe(|| {
                    factory.construct(config.clone(), &mut api)
                }))
                .unwrap_or_else(|payload| {
                    Err(ConstructionError::Panicked(panic_message(payload.as_ref())))
                })
            };

            match constructed {
                Ok(instance) => {
                    info!(module = %id, "module loaded");
                    modules.push(ModuleInstance {
                        id,
                        config,
                        instance,
                    });
                },
                Err(source) => match self.options.construction_failure {
                    ConstructionFailure::Abort => {
                        error!(module = %id, error = %source, "module construction failed");
                        return Err(StartupError::Construction { module: id, source });
                    },
                    ConstructionFailure::SkipModule => {
                        let dropped_hooks = hooks.discard_owner(&id);
                        let dropped_resources = resources.discard_owner(&id);
                        error!(
                            module = %id,
                            error = %source,
                            dropped_hooks,
                            dropped_resources,
                            "module construction failed, skipping module"
                        );
                        skipped.push(SkippedModule { id, error: source });
                    },
                },
            }
        }

        if modules.is_empty() && !skipped.is_empty() {
            warn!(skipped = skipped.len(), "every configured module was skipped");
        }
        info!(
            modules = modules.len(),
            hooks = hooks.len(),
            resources = resources.len(),
            "module host ready"
        );

        let hooks = Arc::new(hooks);
        let dispatcher = Dispatcher::new(Arc::clone(&hooks))
            .with_reporter(Arc::clone(&self.reporter))
            .with_failure_mode(self.options.failure_mode);

        Ok(ModuleHost {
            modules,
            skipped,
            hooks,
            resources: Arc::new(resources),
            dispatcher,
        })
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("factories", &self.factories)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// The loaded modules and their frozen registries.
pub struct ModuleHost {
    modules: Vec<ModuleInstance>,
    skipped: Vec<SkippedModule>,
    hooks: Arc<HookRegistry>,
    resources: Arc<ResourceRegistry>,
    dispatcher: Dispatcher,
}

impl ModuleHost {
    /// The dispatcher for hook invocations.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The handler registered at exactly `path`.
    #[must_use]
    pub fn lookup_resource(&self, path: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.resources.lookup(path)
    }

    /// The resource registry.
    #[must_use]
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Loaded modules, in configuration order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleInstance] {
        &self.modules
    }

    /// Modules dropped at startup.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedModule] {
        &self.skipped
    }

    /// The first loaded module of concrete type `M`.
    #[must_use]
    pub fn module<M: Any>(&self) -> Option<&M> {
        self.modules.iter().find_map(ModuleInstance::downcast_ref::<M>)
    }

    /// Bindings of `category`, in dispatch order.
    #[must_use]
    pub fn bindings(&self, category: HookCategory) -> Vec<BindingInfo> {
        self.hooks.infos(category)
    }
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("modules", &self.modules)
            .field("skipped", &self.skipped)
            .field("hooks", &self.hooks)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}
