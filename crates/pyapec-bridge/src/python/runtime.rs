//! Embedded Python runtime initialization and management.
//!
//! The interpreter is a process-wide resource. It is started on first use and
//! never finalized: XSPEC evaluates the model many times per fit, and paying
//! for interpreter start-up and teardown on every evaluation is not an option.
//!
//! # Overview
//!
//! 1. **Interpreter Init** - [`initialize()`] starts the interpreter exactly once
//! 2. **Search Path** - [`append_search_path()`] adds the script directory to `sys.path`
//! 3. **Support Imports** - [`import_support_module()`] imports a library into `__main__`
//! 4. **Script Location** - [`resolve_script_dir()`] falls back to the bundled script
//!
//! # Thread Safety
//!
//! [`initialize()`] is safe to call from multiple threads; only the first call
//! performs initialization, subsequent calls return the cached result. All
//! other functions take a [`Python`] token and therefore run under the GIL.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::python::embedded::EMBEDDED_FILES;
use pyo3::prelude::*;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Stores the result of initialization to ensure it only happens once.
static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

/// The application name used for the app data directory.
///
/// The bundled script is extracted below it:
/// - Linux: `~/.local/share/pyapec-bridge/python/`
/// - macOS: `~/Library/Application Support/pyapec-bridge/python/`
/// - Windows: `%APPDATA%/pyapec-bridge/python/`
const APP_NAME: &str = "pyapec-bridge";

/// Starts the embedded interpreter if it is not already running.
///
/// # Errors
///
/// Returns [`BridgeError::RuntimeInit`] if the interpreter cannot import `sys`
/// after start-up. The failure is cached; later calls return the same error.
pub fn initialize() -> Result<(), BridgeError> {
    let result = INIT_RESULT.get_or_init(do_initialize);

    match result {
        Ok(()) => Ok(()),
        Err(msg) => Err(BridgeError::RuntimeInit(msg.clone())),
    }
}

fn do_initialize() -> Result<(), String> {
    // Tolerates an interpreter the host already started.
    Python::initialize();

    Python::attach(|py| {
        let sys = py
            .import("sys")
            .map_err(|e| format!("Failed to import sys: {}", e))?;
        let version: String = sys
            .getattr("version")
            .and_then(|v| v.extract())
            .unwrap_or_default();
        debug!(python_version = %version, "Embedded Python interpreter ready");
        Ok(())
    })
}

/// Checks whether the interpreter has been successfully initialized.
#[must_use]
pub fn is_initialized() -> bool {
    INIT_RESULT.get().is_some_and(|r| r.is_ok())
}

/// Appends `dir` to `sys.path` unless it is already present.
///
/// Returns `true` if the path was added.
///
/// # Errors
///
/// Returns [`BridgeError::RuntimeInit`] if `sys.path` cannot be read or
/// modified, or if `dir` is not valid UTF-8.
pub fn append_search_path(py: Python<'_>, dir: &Path) -> Result<bool, BridgeError> {
    let dir_str = dir.to_str().ok_or_else(|| {
        BridgeError::RuntimeInit(format!(
            "Script directory is not valid UTF-8: {}",
            dir.display()
        ))
    })?;

    let sys_path = py
        .import("sys")
        .and_then(|sys| sys.getattr("path"))
        .map_err(|e| BridgeError::RuntimeInit(format!("Failed to access sys.path: {}", e)))?;

    let present = sys_path
        .contains(dir_str)
        .map_err(|e| BridgeError::RuntimeInit(format!("Failed to read sys.path: {}", e)))?;
    if present {
        return Ok(false);
    }

    sys_path
        .call_method1("append", (dir_str,))
        .map_err(|e| BridgeError::RuntimeInit(format!("Failed to extend sys.path: {}", e)))?;
    debug!(path = dir_str, "Appended script directory to sys.path");
    Ok(true)
}

/// Imports `name` and binds its top-level package in `__main__`.
///
/// This is what `import scipy.stats` does when run at the interpreter's top
/// level: the submodule is loaded and `scipy` becomes a global.
///
/// # Errors
///
/// Returns [`BridgeError::Python`] if the import fails.
pub fn import_support_module(py: Python<'_>, name: &str) -> Result<(), BridgeError> {
    py.import(name)?;

    let top_level = name.split('.').next().unwrap_or(name);
    let package = py.import(top_level)?;
    py.import("__main__")?.setattr(top_level, package)?;

    debug!(module = name, "Imported support module into __main__");
    Ok(())
}

/// Imports every support module in `config`, logging failures as warnings.
pub(crate) fn import_support_modules(py: Python<'_>, config: &BridgeConfig) {
    for name in &config.support_modules {
        if let Err(e) = import_support_module(py, name) {
            warn!(module = %name, error = %e, "Failed to import support module");
        }
    }
}

/// Returns the directory the script module is imported from.
///
/// Uses `config.script_dir` when set; otherwise extracts the bundled script
/// and returns the directory it was written to.
///
/// # Errors
///
/// Returns [`BridgeError::Io`] if the bundled script cannot be written.
pub fn resolve_script_dir(config: &BridgeConfig) -> Result<PathBuf, BridgeError> {
    match &config.script_dir {
        Some(dir) => Ok(dir.clone()),
        None => extract_bundled_scripts(),
    }
}

/// Returns the platform-specific app data directory for extracted files.
///
/// Falls back to `{temp_dir}/pyapec-bridge/` when no home directory is known.
fn get_app_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg_data) = env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg_data).join(APP_NAME);
        }
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(".local").join("share").join(APP_NAME);
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_NAME);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = env::var("APPDATA") {
            return PathBuf::from(appdata).join(APP_NAME);
        }
    }

    env::temp_dir().join(APP_NAME)
}

/// Writes the bundled scripts to `{app_data_dir}/python/`.
///
/// Files that already hold the bundled content are not rewritten.
fn extract_bundled_scripts() -> Result<PathBuf, BridgeError> {
    let python_dir = get_app_data_dir().join("python");
    write_embedded_files(&python_dir)?;
    Ok(python_dir)
}

fn write_embedded_files(target: &Path) -> Result<(), BridgeError> {
    fs::create_dir_all(target)?;

    for file in EMBEDDED_FILES {
        let file_path = target.join(file.path);
        if fs::read_to_string(&file_path).is_ok_and(|existing| existing == file.content) {
            continue;
        }
        fs::write(&file_path, file.content)?;
        debug!(path = %file_path.display(), "Extracted bundled script");
    }

    Ok(())
}
