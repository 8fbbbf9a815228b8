//! The bridge between the XSPEC model ABI and the Python model function.
//!
//! A [`Bridge`] owns the imported script module and calls one function in it:
//!
//! ```text
//! energies: &[f64] ─┐
//! params:   &[f64] ─┼─► (list, list, list) ─► module.function(...) ─► result
//! flux:     &[f64] ─┘                                                    │
//!        ▲                                                               │
//!        └──────────── read back flux.len() floats ◄─────────────────────┘
//! ```
//!
//! Every failure is logged to stderr and returned as a [`BridgeError`]. The
//! caller's flux buffer is written only after the whole result has been read
//! back, so a failed call leaves it exactly as it was.
//!
//! # Example
//!
//! ```rust,ignore
//! use pyapec_bridge::{Bridge, BridgeConfig};
//!
//! let config = BridgeConfig::builder()
//!     .script_dir("/scratch1/pyspectrum")
//!     .build()?;
//! let bridge = Bridge::new(config);
//!
//! let energies = [0.5, 1.0, 1.5, 2.0];
//! let params = [6.0, 1.0, 0.0, 1.0];
//! let mut flux = vec![0.0; energies.len() - 1];
//! bridge.invoke(&energies, &params, &mut flux)?;
//! ```

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::python::conversion::{
    describe_python_error, print_python_error, read_bins, slice_to_list,
};
use crate::python::runtime;
use pyo3::prelude::*;
use pyo3::types::{PyModule, PyTuple};
use tracing::{debug, error};

/// Adapter that evaluates a spectral model through a Python function.
///
/// Construction starts the interpreter (once per process), puts the script
/// directory on `sys.path`, imports the support libraries and then the script
/// module. [`invoke()`](Self::invoke) resolves the model function and calls it.
///
/// A bridge whose module failed to import stays usable as a value but every
/// [`invoke()`](Self::invoke) fails with [`BridgeError::ModuleNotLoaded`].
pub struct Bridge {
    config: BridgeConfig,
    /// The imported script module, `None` if the import failed.
    module: Option<Py<PyModule>>,
}

static_assertions::assert_impl_all!(Bridge: Send, Sync);

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("module", &self.config.module_name)
            .field("function", &self.config.function_name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Bridge {
    /// Creates a bridge, logging instead of returning initialization errors.
    ///
    /// Use [`is_loaded()`](Self::is_loaded) to check whether the module was
    /// imported.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let module = match initialize(&config) {
            Ok(module) => Some(module),
            Err(e) => {
                error!(
                    module = %config.module_name,
                    error = %e,
                    "Failed to import python script module"
                );
                None
            }
        };

        Self { config, module }
    }

    /// Creates a bridge, returning the initialization error if any.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::RuntimeInit`] if the interpreter or `sys.path` setup failed
    /// - [`BridgeError::Io`] if the bundled script could not be extracted
    /// - [`BridgeError::ModuleLoad`] if the script module failed to import
    pub fn try_new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let module = initialize(&config)?;
        Ok(Self {
            config,
            module: Some(module),
        })
    }

    /// Returns `true` if the script module was imported successfully.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    /// Returns the configuration this bridge was built with.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Evaluates the model, filling `flux` with the returned bins.
    ///
    /// `flux` must already have one element per energy bin; its current
    /// contents are passed to the function as the third argument. If the
    /// function returns a sequence, the bins are read from it; if it returns
    /// `None` or any other object without a length, they are read back from
    /// the list it was given (in-place update). Only the first `flux.len()`
    /// elements are used.
    ///
    /// Returns the number of bins written.
    ///
    /// # Errors
    ///
    /// On any error `flux` is left unmodified and the error is also logged.
    ///
    /// - [`BridgeError::EmptyInput`] if `energies` or `params` is empty
    /// - [`BridgeError::ModuleNotLoaded`] if the module import failed
    /// - [`BridgeError::SymbolResolution`] if the function is missing or not callable
    /// - [`BridgeError::CallFailure`] if the function raised
    /// - [`BridgeError::Conversion`] if the result holds too few or non-numeric elements
    pub fn invoke(
        &self,
        energies: &[f64],
        params: &[f64],
        flux: &mut [f64],
    ) -> Result<usize, BridgeError> {
        let outcome = self.call_model(energies, params, flux);

        match &outcome {
            Ok(bins) => debug!(bins, function = %self.config.function_name, "Model evaluated"),
            Err(e) => error!(
                function = %self.config.function_name,
                error = %e,
                "Model evaluation failed"
            ),
        }

        outcome
    }

    fn call_model(
        &self,
        energies: &[f64],
        params: &[f64],
        flux: &mut [f64],
    ) -> Result<usize, BridgeError> {
        if energies.is_empty() || params.is_empty() {
            return Err(BridgeError::EmptyInput {
                energies: energies.len(),
                params: params.len(),
            });
        }

        let cached = self.module.as_ref().ok_or(BridgeError::ModuleNotLoaded)?;

        Python::attach(|py| {
            let module = if self.config.cache_module {
                cached.bind(py).clone()
            } else {
                import_module(py, &self.config.module_name)?
            };

            let function = self.resolve_function(&module)?;

            let py_energies = slice_to_list(py, energies)?;
            let py_params = slice_to_list(py, params)?;
            let py_flux = slice_to_list(py, flux)?;

            let args = PyTuple::new(
                py,
                [py_energies.as_any(), py_params.as_any(), py_flux.as_any()],
            )?;

            let result = function.call1(args).map_err(|e| {
                print_python_error(py, &e);
                BridgeError::CallFailure {
                    function: self.config.function_name.clone(),
                    message: describe_python_error(py, &e),
                }
            })?;

            // A result without a length (None, a status code) means the
            // function updated the list it was given.
            let source = if result.is_none() || result.len().is_err() {
                py_flux.as_any()
            } else {
                &result
            };
            let bins = read_bins(source, flux.len())?;

            flux.copy_from_slice(&bins);
            Ok(bins.len())
        })
    }

    fn resolve_function<'py>(
        &self,
        module: &Bound<'py, PyModule>,
    ) -> Result<Bound<'py, PyAny>, BridgeError> {
        let name = &self.config.function_name;

        let function = module
            .getattr(name.as_str())
            .map_err(|e| BridgeError::SymbolResolution {
                function: name.clone(),
                message: describe_python_error(module.py(), &e),
            })?;

        if !function.is_callable() {
            let type_name = function
                .get_type()
                .qualname()
                .map(|s| s.to_string())
                .unwrap_or_default();
            return Err(BridgeError::SymbolResolution {
                function: name.clone(),
                message: format!("object of type '{}' is not callable", type_name),
            });
        }

        Ok(function)
    }
}

/// Prepares the interpreter for `config` and imports its module.
///
/// 1. Starts the interpreter if it is not running
/// 2. Appends the script directory to `sys.path`
/// 3. Imports the support libraries into `__main__`
/// 4. Imports the script module
fn initialize(config: &BridgeConfig) -> Result<Py<PyModule>, BridgeError> {
    runtime::initialize()?;
    let script_dir = runtime::resolve_script_dir(config)?;

    Python::attach(|py| {
        runtime::append_search_path(py, &script_dir)?;
        runtime::import_support_modules(py, config);
        let module = import_module(py, &config.module_name)?;
        debug!(
            module = %config.module_name,
            path = %script_dir.display(),
            "Imported python script module"
        );
        Ok(module.unbind())
    })
}

fn import_module<'py>(py: Python<'py>, name: &str) -> Result<Bound<'py, PyModule>, BridgeError> {
    py.import(name).map_err(|e| {
        print_python_error(py, &e);
        BridgeError::ModuleLoad {
            module: name.to_string(),
            message: describe_python_error(py, &e),
        }
    })
}
