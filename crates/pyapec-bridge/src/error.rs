//! Error types for the pyapec-bridge crate.
//!
//! This module defines [`BridgeError`], the error type returned by the internal
//! API ([`Bridge::try_new`](crate::Bridge::try_new), [`Bridge::invoke`](crate::Bridge::invoke),
//! the config builder). The host-facing entry points never return it: they log
//! the error and return, because the XSPEC model ABI is `void`.
//!
//! # Example
//!
//! ```
//! use pyapec_bridge::{BridgeError, FailureKind};
//!
//! let err = BridgeError::EmptyInput { energies: 0, params: 3 };
//! assert_eq!(err.kind(), FailureKind::EmptyInput);
//! ```

use thiserror::Error;

/// Coarse classification of a [`BridgeError`].
///
/// Tests and callers that only care about *which step* failed match on this
/// rather than on the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureKind {
    /// The energy grid or the parameter vector was empty.
    EmptyInput,
    /// The script module could not be imported.
    ModuleLoadFailure,
    /// The model function is missing from the module or is not callable.
    SymbolResolutionFailure,
    /// The model function raised.
    CallFailure,
    /// A value could not be converted across the boundary.
    ConversionFailure,
    /// The interpreter could not be started or configured.
    RuntimeInitFailure,
    /// The bridge configuration was rejected.
    InvalidConfig,
    /// Filesystem error while extracting the bundled script or reading config.
    Io,
    /// Any other Python exception.
    Python,
}

/// The main error type for bridge operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    /// The energy grid or the parameter vector had zero length.
    #[error("Input arrays must not be empty (energies: {energies}, params: {params})")]
    EmptyInput {
        /// Length of the energy grid that was passed.
        energies: usize,
        /// Length of the parameter vector that was passed.
        params: usize,
    },

    /// The script module failed to import.
    ///
    /// Common causes:
    /// - The script directory is not the one the module lives in
    /// - The script raised at import time (missing `pyatomdb`, syntax error)
    #[error("Failed to import python script module '{module}': {message}")]
    ModuleLoad {
        /// The module name that was imported.
        module: String,
        /// The Python exception message.
        message: String,
    },

    /// `invoke` was called on a bridge whose module import failed.
    #[error("Python script module is not loaded")]
    ModuleNotLoaded,

    /// The model function could not be found or is not callable.
    #[error("python function '{function}' not found or not callable: {message}")]
    SymbolResolution {
        /// The function name that was looked up.
        function: String,
        /// Why the lookup failed.
        message: String,
    },

    /// The model function raised an exception.
    #[error("Error occurred during python function call '{function}': {message}")]
    CallFailure {
        /// The function that was called.
        function: String,
        /// The Python exception message.
        message: String,
    },

    /// A returned value could not be read back as `f64` bins.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The embedded interpreter could not be initialized.
    #[error("Runtime initialization failed: {0}")]
    RuntimeInit(String),

    /// Invalid configuration provided to the bridge.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error while extracting the bundled script or reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for Python exceptions outside the steps above.
    #[error("Python error: {message}")]
    Python {
        /// The Python exception message.
        message: String,
    },
}

impl BridgeError {
    /// Returns the [`FailureKind`] of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            BridgeError::EmptyInput { .. } => FailureKind::EmptyInput,
            BridgeError::ModuleLoad { .. } | BridgeError::ModuleNotLoaded => {
                FailureKind::ModuleLoadFailure
            }
            BridgeError::SymbolResolution { .. } => FailureKind::SymbolResolutionFailure,
            BridgeError::CallFailure { .. } => FailureKind::CallFailure,
            BridgeError::Conversion(_) => FailureKind::ConversionFailure,
            BridgeError::RuntimeInit(_) => FailureKind::RuntimeInitFailure,
            BridgeError::InvalidConfig(_) => FailureKind::InvalidConfig,
            BridgeError::Io(_) => FailureKind::Io,
            BridgeError::Python { .. } => FailureKind::Python,
        }
    }
}

impl From<pyo3::PyErr> for BridgeError {
    fn from(err: pyo3::PyErr) -> Self {
        BridgeError::Python {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::InvalidConfig(err.to_string())
    }
}
