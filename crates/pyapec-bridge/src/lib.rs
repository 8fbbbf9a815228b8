//! pyapec-bridge: XSPEC local models evaluated by an embedded Python script.
//!
//! XSPEC local models are native functions that fill a flux array for an
//! energy grid and a parameter vector. This crate implements such a function
//! by calling into Python: it embeds an interpreter, imports a model script
//! and passes the three arrays to one function in it.
//!
//! The default script (`pyapec_script.pyapec`) evaluates a collisional
//! ionization equilibrium plasma with `pyatomdb`, but any function with the
//! signature `f(energies, params, flux)` works.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pyapec_bridge::{Bridge, BridgeConfig};
//!
//! let config = BridgeConfig::builder()
//!     .script_dir("/scratch1/pyspectrum")
//!     .module_name("pyapec_script")
//!     .function_name("pyapec")
//!     .build()?;
//!
//! let bridge = Bridge::try_new(config)?;
//!
//! let energies = [0.5, 0.6, 0.7, 0.8];
//! let params = [1.0, 1.0, 0.0, 1.0];
//! let mut flux = vec![0.0; energies.len() - 1];
//! bridge.invoke(&energies, &params, &mut flux)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      XSPEC (C++ model shim)                      │
//! │  pyapecInfo(energy, params, spec, flux&, fluxErr&, init)         │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ pyapec_info_c (C ABI)
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  pyapec_info ──► shared Bridge ──► Bridge::invoke                │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ PyO3
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Embedded Python                                                 │
//! │  sys.path += script_dir; import numpy, scipy.stats; import mod   │
//! │  module.function(list[float], list[float], list[float])          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! The internal API returns [`Result<T, BridgeError>`]. The host-facing entry
//! points ([`pyapec_info()`] and [`ffi::pyapec_info_c`]) return nothing, as the
//! XSPEC model ABI requires: every failure is logged to stderr and the flux
//! array keeps the zeros it was sized with.
//!
//! # Thread Safety
//!
//! The interpreter is initialized once per process and never finalized. Python
//! calls hold the GIL; the shared bridge behind [`pyapec_info()`] is guarded
//! by a mutex, so concurrent host calls run one after another.
//!
//! # Modules
//!
//! - [`python`] - interpreter lifecycle, conversions and the bundled script
//! - [`ffi`] - the C entry point linked by the XSPEC model package
//! - [`logging`] - stderr diagnostics

mod bridge;
mod config;
mod error;
pub mod ffi;
pub mod logging;
mod model;
pub mod python;

// Re-export public API
//
// Bridge
pub use bridge::Bridge;
// Configuration types
pub use config::{
    BridgeConfig, BridgeConfigBuilder, DEFAULT_FUNCTION, DEFAULT_MODULE, DEFAULT_SUPPORT_MODULES,
};
// Error types
pub use error::{BridgeError, FailureKind};
// Host entry points
pub use model::{evaluate, pyapec_info};

/// Start the embedded Python interpreter.
///
/// Bridges call this themselves; calling it up front only moves the start-up
/// cost to a time of your choosing. Subsequent calls return immediately.
///
/// # Errors
///
/// Returns [`BridgeError::RuntimeInit`] if the interpreter cannot be started.
pub fn initialize() -> Result<(), BridgeError> {
    python::runtime::initialize()
}

/// Check if the embedded interpreter has been successfully initialized.
#[must_use = "the initialization status should be checked"]
pub fn is_initialized() -> bool {
    python::runtime::is_initialized()
}
