//! Check command: load a configuration and report what the modules registered.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use homestead_config::HostConfig;
use homestead_core::HookCategory;
use homestead_modules::{LoaderOptions, ModuleHost};

use super::build_host;
use crate::theme::Theme;

/// What a loaded host looks like, without styling.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct HostSummary {
    pub(crate) modules: Vec<String>,
    pub(crate) skipped: Vec<(String, String)>,
    pub(crate) resources: Vec<(String, String)>,
    pub(crate) bindings: Vec<(HookCategory, Vec<String>)>,
}

impl HostSummary {
    pub(crate) fn of(host: &ModuleHost) -> Self {
        Self {
            modules: host.modules().iter().map(|m| m.id().to_string()).collect(),
            skipped: host
                .skipped()
                .iter()
                .map(|s| (s.id.to_string(), s.error.to_string()))
                .collect(),
            resources: host
                .resources()
                .bindings()
                .into_iter()
                .map(|b| (b.path().to_string(), b.owner().to_string()))
                .collect(),
            bindings: HookCategory::ALL
                .into_iter()
                .map(|category| {
                    let owners = host
                        .bindings(category)
                        .into_iter()
                        .map(|b| b.owner.to_string())
                        .collect();
                    (category, owners)
                })
                .collect(),
        }
    }
}

/// Load every configured module and print what it registered.
pub(crate) fn run_check(path: &Path, config: &HostConfig, verbose: bool) -> Result<()> {
    println!("{}", Theme::header("Homestead Check - Module Host Startup"));
    println!();
    println!("  Config: {}", path.display());
    println!("  Modules configured: {}", config.modules.len());

    let options = LoaderOptions::from(&config.dispatch);
    println!(
        "  Callback failures: {:?}, construction failures: {:?}",
        options.failure_mode, options.construction_failure
    );

    if verbose {
        for entry in &config.modules {
            let raw = serde_json::to_string(&entry.config)?;
            println!("    {} {}", entry.module, Theme::dimmed(&raw));
        }
    }
    println!();

    let host = match build_host(config) {
        Ok(host) => host,
        Err(e) => {
            println!("{}", Theme::error(&format!("Startup failed in {}: {e}", e.module())));
            return Err(e.into());
        },
    };
    let summary = HostSummary::of(&host);

    println!("{}", "Loaded modules:".cyan());
    for module in &summary.modules {
        println!("  {}", Theme::success(module));
    }
    for (module, error) in &summary.skipped {
        println!("  {} {}", Theme::warning(module), Theme::dimmed(error));
    }

    println!("\n{}", "Web resources:".cyan());
    if summary.resources.is_empty() {
        println!("  {}", Theme::dimmed("(none)"));
    }
    for (path, owner) in &summary.resources {
        println!("  {path} {}", Theme::dimmed(&format!("<- {owner}")));
    }

    println!("\n{}", "Hook bindings:".cyan());
    for (category, owners) in &summary.bindings {
        if owners.is_empty() {
            if verbose {
                println!("  {category}: {}", Theme::dimmed("(none)"));
            }
            continue;
        }
        println!("  {category}: {}", owners.join(" -> "));
    }

    println!();
    if summary.skipped.is_empty() {
        println!("{}", "All modules started".green().bold());
    } else {
        println!(
            "{}",
            format!("{} module(s) skipped", summary.skipped.len())
                .yellow()
                .bold()
        );
    }

    Ok(())
}
