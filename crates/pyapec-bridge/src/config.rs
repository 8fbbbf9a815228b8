//! Configuration for the bridge.
//!
//! [`BridgeConfig`] names the external computation the bridge calls: which
//! directory to add to `sys.path`, which module to import from it, which
//! function to call, and which support libraries to import first.
//!
//! # Example
//!
//! ```
//! use pyapec_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::builder()
//!     .script_dir("/opt/models/pyspectrum")
//!     .module_name("pyapec_script")
//!     .function_name("pyapec")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.function_name, "pyapec");
//! ```
//!
//! # Environment
//!
//! Inside XSPEC there is no place to pass options, so the host entry point
//! builds its config with [`BridgeConfig::from_env()`]:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `PYAPEC_CONFIG` | JSON file with any of the config fields, read first |
//! | `PYAPEC_SCRIPT_DIR` | Overrides `script_dir` |
//! | `PYAPEC_MODULE` | Overrides `module_name` |
//! | `PYAPEC_FUNCTION` | Overrides `function_name` |
//! | `PYAPEC_SUPPORT_MODULES` | Comma-separated `support_modules`, empty for none |

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default module imported from the script directory.
pub const DEFAULT_MODULE: &str = "pyapec_script";

/// Default function called inside the module.
pub const DEFAULT_FUNCTION: &str = "pyapec";

/// Support libraries imported into `__main__` before the module.
pub const DEFAULT_SUPPORT_MODULES: [&str; 2] = ["numpy", "scipy.stats"];

pub(crate) const ENV_CONFIG_FILE: &str = "PYAPEC_CONFIG";
pub(crate) const ENV_SCRIPT_DIR: &str = "PYAPEC_SCRIPT_DIR";
pub(crate) const ENV_MODULE: &str = "PYAPEC_MODULE";
pub(crate) const ENV_FUNCTION: &str = "PYAPEC_FUNCTION";
pub(crate) const ENV_SUPPORT_MODULES: &str = "PYAPEC_SUPPORT_MODULES";

/// Configuration for a [`Bridge`](crate::Bridge).
///
/// Use [`BridgeConfig::builder()`] to construct a validated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Directory appended to `sys.path` before importing the module.
    ///
    /// If `None`, the bundled `pyapec_script.py` is extracted to the app data
    /// directory and that directory is used.
    pub script_dir: Option<PathBuf>,

    /// Dotted name of the module to import (default: `pyapec_script`).
    pub module_name: String,

    /// Name of the model function inside the module (default: `pyapec`).
    ///
    /// It is called as `function(energies, params, flux)` with three lists of floats.
    pub function_name: String,

    /// Libraries imported into `__main__` before the module (default: `numpy`, `scipy.stats`).
    ///
    /// A failed support import is logged and otherwise ignored.
    pub support_modules: Vec<String>,

    /// Keep the imported module for the lifetime of the bridge (default: true).
    ///
    /// When false the module is looked up again on every call.
    pub cache_module: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            script_dir: None,
            module_name: DEFAULT_MODULE.to_string(),
            function_name: DEFAULT_FUNCTION.to_string(),
            support_modules: DEFAULT_SUPPORT_MODULES.map(String::from).to_vec(),
            cache_module: true,
        }
    }
}

impl BridgeConfig {
    /// Create a new builder for `BridgeConfig`.
    #[must_use]
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// See the module docs for the variables that are read.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if `PYAPEC_CONFIG` names an unreadable file,
    /// and [`BridgeError::InvalidConfig`] if the file is not valid JSON or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env()`](Self::from_env), but reads variables through `lookup`.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup(ENV_CONFIG_FILE) {
            Some(path) => {
                let text = fs::read_to_string(&path)?;
                serde_json::from_str::<BridgeConfig>(&text)?
            }
            None => BridgeConfig::default(),
        };

        let mut builder = BridgeConfigBuilder { config: base };

        if let Some(dir) = lookup(ENV_SCRIPT_DIR) {
            builder = builder.script_dir(dir);
        }
        if let Some(module) = lookup(ENV_MODULE) {
            builder = builder.module_name(module);
        }
        if let Some(function) = lookup(ENV_FUNCTION) {
            builder = builder.function_name(function);
        }
        if let Some(modules) = lookup(ENV_SUPPORT_MODULES) {
            builder = builder.support_modules(
                modules
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from),
            );
        }

        builder.build()
    }
}

/// Builder for [`BridgeConfig`].
///
/// Created via [`BridgeConfig::builder()`]. All setters return `self` to allow
/// method chaining.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    /// Set the directory appended to `sys.path`.
    #[must_use]
    pub fn script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.script_dir = Some(dir.into());
        self
    }

    /// Set the module to import.
    #[must_use]
    pub fn module_name(mut self, module: impl Into<String>) -> Self {
        self.config.module_name = module.into();
        self
    }

    /// Set the function to call.
    #[must_use]
    pub fn function_name(mut self, function: impl Into<String>) -> Self {
        self.config.function_name = function.into();
        self
    }

    /// Replace the support libraries imported before the module.
    #[must_use]
    pub fn support_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.support_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable module caching (default: true).
    #[must_use]
    pub fn cache_module(mut self, cache: bool) -> Self {
        self.config.cache_module = cache;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfig`] if:
    /// - `module_name` or any support module is not a dotted Python identifier
    /// - `function_name` is not a Python identifier
    /// - `script_dir` is set to an empty path
    pub fn build(self) -> Result<BridgeConfig, BridgeError> {
        if !is_dotted_identifier(&self.config.module_name) {
            return Err(BridgeError::InvalidConfig(format!(
                "module_name '{}' is not a valid Python module name",
                self.config.module_name
            )));
        }

        if !is_identifier(&self.config.function_name) {
            return Err(BridgeError::InvalidConfig(format!(
                "function_name '{}' is not a valid Python identifier",
                self.config.function_name
            )));
        }

        if let Some(bad) = self
            .config
            .support_modules
            .iter()
            .find(|m| !is_dotted_identifier(m))
        {
            return Err(BridgeError::InvalidConfig(format!(
                "support_modules entry '{}' is not a valid Python module name",
                bad
            )));
        }

        if self
            .config
            .script_dir
            .as_ref()
            .is_some_and(|d| d.as_os_str().is_empty())
        {
            return Err(BridgeError::InvalidConfig(
                "script_dir must not be empty".to_string(),
            ));
        }

        Ok(self.config)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn is_dotted_identifier(name: &str) -> bool {
    name.split('.').all(is_identifier)
}
