//! XSPEC model entry point.
//!
//! XSPEC calls a local model with the signature
//!
//! ```text
//! (energyArray, params, spectrumNumber, fluxArray&, fluxErrArray&, initString)
//! ```
//!
//! [`pyapec_info()`] is that function on the Rust side. It sizes the output
//! arrays the way XSPEC expects (one flux value per energy bin, no flux
//! errors) and evaluates through a [`Bridge`] shared by all calls in the
//! process. Nothing is returned: failures are logged and leave the zeroed
//! flux array behind.

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::logging;
use parking_lot::Mutex;
use tracing::{trace, warn};

/// Bridge shared by every host call, created on first use.
static SHARED_BRIDGE: Mutex<Option<Bridge>> = Mutex::new(None);

/// Evaluates the model through the process-wide bridge.
///
/// - `flux` is resized to `energy.len() - 1` bins, all set to `0.0`
/// - `flux_err` is emptied; flux errors are not computed
/// - `spectrum_number` and `init_string` are accepted and ignored
///
/// The shared bridge is configured from the environment (see
/// [`BridgeConfig::from_env()`]). If its module failed to import, it is built
/// again on the next call.
pub fn pyapec_info(
    energy: &[f64],
    params: &[f64],
    spectrum_number: i32,
    flux: &mut Vec<f64>,
    flux_err: &mut Vec<f64>,
    init_string: &str,
) {
    logging::init();
    trace!(spectrum_number, init_string, "pyapec_info called");

    resize_outputs(energy.len(), flux, flux_err);
    evaluate_shared(energy, params, flux);
}

/// Same as [`pyapec_info()`] but against an explicit bridge, returning the outcome.
///
/// # Errors
///
/// Returns whatever [`Bridge::invoke()`] returns. `flux` and `flux_err` are
/// resized even when the evaluation fails.
pub fn evaluate(
    bridge: &Bridge,
    energy: &[f64],
    params: &[f64],
    flux: &mut Vec<f64>,
    flux_err: &mut Vec<f64>,
) -> Result<usize, BridgeError> {
    resize_outputs(energy.len(), flux, flux_err);
    bridge.invoke(energy, params, flux)
}

/// Runs `bridge.invoke` on the shared bridge, discarding the (already logged) outcome.
pub(crate) fn evaluate_shared(energy: &[f64], params: &[f64], flux: &mut [f64]) {
    let mut guard = SHARED_BRIDGE.lock();

    if guard.as_ref().is_some_and(|b| !b.is_loaded()) {
        *guard = None;
    }
    let bridge = guard.get_or_insert_with(|| Bridge::new(shared_config()));

    let _ = bridge.invoke(energy, params, flux);
}

/// Resizes the output arrays the way `std::valarray::resize` does: every element reset.
fn resize_outputs(energy_len: usize, flux: &mut Vec<f64>, flux_err: &mut Vec<f64>) {
    flux.clear();
    flux.resize(energy_len.saturating_sub(1), 0.0);
    flux_err.clear();
}

fn shared_config() -> BridgeConfig {
    BridgeConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring invalid bridge configuration, using defaults");
        BridgeConfig::default()
    })
}
