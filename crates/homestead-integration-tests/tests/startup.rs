//! Startup: configuration files, module resolution and construction failures.

use std::io::Write;

use homestead_config::HostConfig;
use homestead_core::{HookCategory, SpamCheck};
use homestead_modules::{
    ConstructionError, ConstructionFailure, Decision, LoaderOptions, ModuleLoader, StartupError,
};
use homestead_stock_modules::{ExpiryList, register_stock_modules};
use homestead_test::prelude::*;
use serde_json::json;

fn skip_options() -> LoaderOptions {
    LoaderOptions {
        construction_failure: ConstructionFailure::SkipModule,
        ..LoaderOptions::default()
    }
}

fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn loader_for(recorder: &CallRecorder, config: &HostConfig) -> ModuleLoader {
    let mut registry = ScriptedModuleFactory::new(recorder.clone()).into_registry();
    register_stock_modules(&mut registry);
    ModuleLoader::new(registry).with_options(LoaderOptions::from(&config.dispatch))
}

#[test]
fn test_construction_failure_aborts_by_default() {
    let recorder = CallRecorder::new();
    let err = scripted_loader(&recorder)
        .load([
            scripted("ok", json!({})),
            scripted("bad", json!({ "fail_construction": "database unreachable" })),
        ])
        .unwrap_err();

    assert_eq!(err.module().index(), 1);
    assert!(matches!(
        err,
        StartupError::Construction {
            source: ConstructionError::Failed { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_skipped_module_leaves_nothing_behind() {
    let recorder = CallRecorder::new();
    let host = scripted_loader(&recorder)
        .with_options(skip_options())
        .load([
            scripted(
                "bad",
                json!({
                    "user_may_create_room": false,
                    "check_event_for_spam": { "result": "spam" },
                    "resources": ["/_test/bad"],
                    "fail_construction": "half-built",
                }),
            ),
            scripted("good", json!({ "user_may_create_room": true })),
        ])
        .unwrap();

    assert_eq!(host.modules().len(), 1);
    assert_eq!(host.skipped().len(), 1);
    assert_eq!(host.skipped()[0].id.index(), 0);
    assert!(host.bindings(HookCategory::CheckEventForSpam).is_empty());
    assert_eq!(host.bindings(HookCategory::UserMayCreateRoom).len(), 1);
    assert!(host.lookup_resource("/_test/bad").is_none());

    let d = host.dispatcher();
    assert_eq!(d.user_may_create_room(&test_user("alice")).await, Decision::Allow);
    assert_eq!(d.check_event_for_spam(&test_event("bob", "hi")).await, SpamCheck::NotSpam);
    assert_eq!(recorder.calls_for("user_may_create_room"), ["good"]);
}

#[test]
fn test_skipped_module_frees_its_paths() {
    let recorder = CallRecorder::new();
    let host = scripted_loader(&recorder)
        .with_options(skip_options())
        .load([
            scripted(
                "bad",
                json!({ "resources": ["/_test/shared"], "panic_in_constructor": true }),
            ),
            scripted("good", json!({ "resources": ["/_test/shared"] })),
        ])
        .unwrap();

    assert!(matches!(
        host.skipped()[0].error,
        ConstructionError::Panicked(_)
    ));
    assert!(recorder.calls().is_empty());
    assert_eq!(
        host.resources().owner_of("/_test/shared").map(|id| id.index()),
        Some(1)
    );
}

#[test]
fn test_config_errors_are_fatal_even_when_skipping() {
    let recorder = CallRecorder::new();
    let err = scripted_loader(&recorder)
        .with_options(skip_options())
        .load([
            scripted("ok", json!({})),
            scripted("picky", json!({ "reject_config": "threshold out of range" })),
        ])
        .unwrap_err();

    let StartupError::Config { module, source } = err else {
        panic!("expected a config error");
    };
    assert_eq!(module.index(), 1);
    assert_eq!(source.field.as_deref(), Some("reject_config"));
    assert_eq!(source.reason, "threshold out of range");
}

#[test]
fn test_unknown_module_is_fatal() {
    let recorder = CallRecorder::new();
    let err = scripted_loader(&recorder)
        .with_options(skip_options())
        .load([descriptor("nowhere.Missing", json!({}))])
        .unwrap_err();

    assert!(matches!(err, StartupError::UnknownModule { ref module } if module.reference() == "nowhere.Missing"));
}

#[tokio::test]
async fn test_toml_file_to_running_host() {
    let file = write_config(
        ".toml",
        r#"
[logging]
level = "debug"

[[modules]]
module = "homestead.stock.KeywordSpamChecker"
[modules.config]
keywords = ["buy now"]

[[modules]]
module = "homestead.test.Scripted"
[modules.config]
label = "tail"
check_event_for_spam = { result = "spam_with_reason", reason = "scripted" }

[[modules]]
module = "homestead.stock.ExpiryList"
[modules.config]
expired_users = ["@old:test.local"]
"#,
    );
    let config = HostConfig::load_file(file.path()).unwrap();
    let recorder = CallRecorder::new();
    let host = loader_for(&recorder, &config)
        .load_entries(&config.modules)
        .unwrap();
    let d = host.dispatcher();

    // The keyword module comes first and answers before the scripted one runs.
    assert_eq!(
        d.check_event_for_spam(&test_event("bob", "Buy now!")).await,
        SpamCheck::Spam
    );
    assert!(recorder.calls().is_empty());

    assert_eq!(
        d.check_event_for_spam(&test_event("bob", "hello")).await,
        SpamCheck::SpamWithReason("scripted".to_string())
    );
    assert_eq!(recorder.calls_for("check_event_for_spam"), ["tail"]);

    d.on_user_registration(&test_user("fresh")).await;
    assert!(d.is_user_expired(&test_user("old")).await);
    assert_eq!(
        host.module::<ExpiryList>().unwrap().registered(),
        [test_user("fresh")]
    );
}

#[tokio::test]
async fn test_yaml_dispatch_section_applies() {
    let file = write_config(
        ".yaml",
        r#"
dispatch:
  on_callback_failure: allow
  on_construction_failure: skip
modules:
  - module: homestead.test.Scripted
    config:
      label: broken
      user_may_create_room: error
  - module: homestead.test.Scripted
    config:
      label: unbuilt
      fail_construction: nope
"#,
    );
    let config = HostConfig::load_file(file.path()).unwrap();
    let recorder = CallRecorder::new();
    let host = loader_for(&recorder, &config)
        .load_entries(&config.modules)
        .unwrap();

    assert_eq!(host.skipped().len(), 1);
    assert_eq!(
        host.dispatcher().user_may_create_room(&test_user("alice")).await,
        Decision::Allow
    );
}

#[test]
fn test_stock_module_config_error_names_item() {
    let file = write_config(
        ".toml",
        r#"
[[modules]]
module = "homestead.stock.RoomPolicy"
[modules.config]
room_creators = ["@ok:.*", "[broken"]
"#,
    );
    let config = HostConfig::load_file(file.path()).unwrap();
    let err = loader_for(&CallRecorder::new(), &config)
        .load_entries(&config.modules)
        .unwrap_err();

    let StartupError::Config { source, .. } = err else {
        panic!("expected a config error");
    };
    assert_eq!(source.field.as_deref(), Some("room_creators[1]"));
}
