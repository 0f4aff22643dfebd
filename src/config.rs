//! # Configuration Module
//!
//! Two layers:
//!
//! - [`MvcConfig`]: a YAML file (every field optional) with environment
//!   overrides, applied to an [`MvcBuilder`](crate::mvc::MvcBuilder) in one
//!   call with `apply_config`.
//! - [`RuntimeConfig`]: coroutine runtime knobs read from the environment.
//!
//! ## Environment Variables
//!
//! | variable                  | overrides                  |
//! |---------------------------|----------------------------|
//! | `BRRTMVC_ADDR`            | `server.addr`              |
//! | `BRRTMVC_VIEWS_DIR`       | `views.dir`                |
//! | `BRRTMVC_VIEWS_SUFFIX`    | `views.suffix`             |
//! | `BRRTMVC_STATIC_PREFIX`   | `static_files.prefix`      |
//! | `BRRTMVC_STATIC_DIR`      | `static_files.dir`         |
//! | `BRRTMVC_MAX_FORM_BYTES`  | `limits.max_form_bytes`    |
//! | `BRRTMVC_STACK_SIZE`      | coroutine stack size, decimal or `0x` hex (default `0x10000`) |
//!
//! ## Example
//!
//! ```yaml
//! server:
//!   addr: "0.0.0.0:8080"
//! views:
//!   dir: "views"
//!   suffix: ".ghtml"
//! static_files:
//!   prefix: "/static/"
//!   dir: "static"
//! errors:
//!   not_found: { controller: "Error", action: "NotFound" }
//!   internal_error: { controller: "Error", action: "Internal" }
//! limits:
//!   max_form_bytes: 10485760
//! ```

use crate::error::ConfigError;
use crate::ids::ControllerAction;
use crate::server::request::DEFAULT_MAX_FORM_BYTES;
use crate::view::DEFAULT_VIEWS_SUFFIX;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MvcConfig {
    pub server: ServerConfig,
    pub views: ViewsConfig,
    pub static_files: Option<StaticConfig>,
    pub errors: ErrorViewsConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewsConfig {
    /// Views root; no folder is parsed when unset.
    pub dir: Option<PathBuf>,
    pub suffix: String,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            suffix: DEFAULT_VIEWS_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticConfig {
    pub prefix: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorViewsConfig {
    pub not_found: Option<ControllerAction>,
    pub internal_error: Option<ControllerAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_form_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }
}

impl MvcConfig {
    /// Parse a YAML document.
    pub fn from_yaml(path: &Path, source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a YAML file, without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &source)
    }

    /// Read a YAML file if given, then apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BRRTMVC_*` overrides looked up through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BRRTMVC_ADDR") {
            debug!(addr = %addr, "Address from environment");
            self.server.addr = addr;
        }
        if let Some(dir) = lookup("BRRTMVC_VIEWS_DIR") {
            self.views.dir = Some(PathBuf::from(dir));
        }
        if let Some(suffix) = lookup("BRRTMVC_VIEWS_SUFFIX") {
            self.views.suffix = suffix;
        }
        match (lookup("BRRTMVC_STATIC_PREFIX"), lookup("BRRTMVC_STATIC_DIR")) {
            (None, None) => {}
            (prefix, dir) => {
                let current = self.static_files.take();
                self.static_files = Some(StaticConfig {
                    prefix: prefix
                        .or_else(|| current.as_ref().map(|s| s.prefix.clone()))
                        .unwrap_or_else(|| "/static/".to_string()),
                    dir: dir
                        .map(PathBuf::from)
                        .or_else(|| current.map(|s| s.dir))
                        .unwrap_or_else(|| PathBuf::from("static")),
                });
            }
        }
        if let Some(raw) = lookup("BRRTMVC_MAX_FORM_BYTES") {
            self.limits.max_form_bytes = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "BRRTMVC_MAX_FORM_BYTES",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 64 KB / 0x10000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let stack_size = lookup("BRRTMVC_STACK_SIZE")
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MvcConfig::default();
        assert_eq!(config.server.addr, DEFAULT_ADDR);
        assert_eq!(config.views.suffix, ".ghtml");
        assert_eq!(config.limits.max_form_bytes, 10 << 20);
        assert!(config.static_files.is_none());
    }

    #[test]
    fn test_stack_size_parsing() {
        assert_eq!(RuntimeConfig::from_lookup(env_of(&[])).stack_size, 0x10000);
        let hex = RuntimeConfig::from_lookup(env_of(&[("BRRTMVC_STACK_SIZE", "0x8000")]));
        assert_eq!(hex.stack_size, 0x8000);
        let dec = RuntimeConfig::from_lookup(env_of(&[("BRRTMVC_STACK_SIZE", "16384")]));
        assert_eq!(dec.stack_size, 16384);
        let bad = RuntimeConfig::from_lookup(env_of(&[("BRRTMVC_STACK_SIZE", "lots")]));
        assert_eq!(bad.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_static_override_fills_missing_half() {
        let mut config = MvcConfig::default();
        config
            .apply_env_from(env_of(&[("BRRTMVC_STATIC_DIR", "public")]))
            .unwrap();
        assert_eq!(
            config.static_files,
            Some(StaticConfig {
                prefix: "/static/".to_string(),
                dir: PathBuf::from("public"),
            })
        );
    }

    #[test]
    fn test_invalid_form_limit() {
        let mut config = MvcConfig::default();
        let err = config
            .apply_env_from(env_of(&[("BRRTMVC_MAX_FORM_BYTES", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "BRRTMVC_MAX_FORM_BYTES", .. }));
    }
}
