//! Subcommands.

pub(crate) mod check;
pub(crate) mod probe;

use homestead_config::HostConfig;
use homestead_modules::{LoaderOptions, ModuleHost, ModuleLoader, StartupResult};
use homestead_stock_modules::stock_registry;

/// Instantiate every configured module against the stock modules.
pub(crate) fn build_host(config: &HostConfig) -> StartupResult<ModuleHost> {
    ModuleLoader::new(stock_registry())
        .with_options(LoaderOptions::from(&config.dispatch))
        .load_entries(&config.modules)
}
