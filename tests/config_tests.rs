use brrtmvc::config::{MvcConfig, StaticConfig};
use brrtmvc::error::ConfigError;
use brrtmvc::prelude::*;
use std::path::{Path, PathBuf};

mod common;
use common::get;

const CONFIG_FILE: &str = "tests/config/brrtmvc.yaml";

#[test]
fn test_loads_full_config_file() {
    let config = MvcConfig::from_file(CONFIG_FILE).unwrap();
    assert_eq!(config.server.addr, "127.0.0.1:18080");
    assert_eq!(config.views.dir, Some(PathBuf::from("tests/views")));
    assert_eq!(
        config.static_files,
        Some(StaticConfig {
            prefix: "/assets/".to_string(),
            dir: PathBuf::from("tests/staticdata"),
        })
    );
    assert_eq!(
        config.errors.not_found,
        Some(ControllerAction::new("error", "notfound"))
    );
    assert_eq!(config.limits.max_form_bytes, 4096);
}

#[test]
fn test_config_drives_the_builder() {
    let config = MvcConfig::from_file(CONFIG_FILE).unwrap();
    let mut builder = MvcBuilder::new();
    builder.apply_config(&config).unwrap();
    let mvc = builder.build();

    assert_eq!(mvc.views().len(), 6);
    assert_eq!(mvc.max_form_bytes(), 4096);

    let resp = get(&mvc, "/assets/hello.txt");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_str(), "Hello\n");

    let resp = get(&mvc, "/nowhere/at/all");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body_str(), "<h1>Missing /nowhere/at/all</h1>");
}

#[test]
fn test_env_overrides_file_values() {
    let mut config = MvcConfig::from_file(CONFIG_FILE).unwrap();
    config
        .apply_env_from(|key| match key {
            "BRRTMVC_ADDR" => Some("0.0.0.0:9000".to_string()),
            "BRRTMVC_STATIC_DIR" => Some("public".to_string()),
            "BRRTMVC_MAX_FORM_BYTES" => Some("128".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.server.addr, "0.0.0.0:9000");
    let static_files = config.static_files.unwrap();
    assert_eq!(static_files.prefix, "/assets/");
    assert_eq!(static_files.dir, PathBuf::from("public"));
    assert_eq!(config.limits.max_form_bytes, 128);
}

#[test]
fn test_unknown_keys_are_rejected() {
    let err = MvcConfig::from_yaml(Path::new("inline.yaml"), "server:\n  port: 80\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("inline.yaml"));
}

#[test]
fn test_incomplete_error_view_fails_apply() {
    let config = MvcConfig::from_yaml(
        Path::new("inline.yaml"),
        "errors:\n  not_found: { controller: \"error\", action: \"\" }\n",
    )
    .unwrap();
    let mut builder = MvcBuilder::new();
    let err = builder.apply_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::Registration(_)));
}

#[test]
fn test_missing_views_dir_fails_apply() {
    let mut config = MvcConfig::default();
    config.views.dir = Some(PathBuf::from("tests/no-such-views"));
    let mut builder = MvcBuilder::new();
    assert!(matches!(
        builder.apply_config(&config).unwrap_err(),
        ConfigError::Views(_)
    ));
}

#[test]
fn test_missing_file_is_a_read_error() {
    assert!(matches!(
        MvcConfig::from_file("tests/config/absent.yaml"),
        Err(ConfigError::Read { .. })
    ));
}
