//! C entry point for the XSPEC model shim.
//!
//! XSPEC's C++ local-model interface passes `std::valarray<double>&`, which
//! cannot cross into Rust directly. A few lines of C++ in the model package
//! forward to [`pyapec_info_c`]:
//!
//! ```cpp
//! extern "C" void pyapec_info_c(const double*, size_t, const double*, size_t,
//!                               int, double*, size_t, const char*);
//!
//! extern "C" void pyapecInfo(const RealArray& energy, const RealArray& params,
//!                            int spectrumNumber, RealArray& flux,
//!                            RealArray& fluxErr, const string& initString) {
//!     flux.resize(energy.size() - 1);
//!     fluxErr.resize(0);
//!     pyapec_info_c(&energy[0], energy.size(), &params[0], params.size(),
//!                   spectrumNumber, &flux[0], flux.size(), initString.c_str());
//! }
//! ```
//!
//! The entry point never returns an error and never unwinds into C++.

use crate::logging;
use crate::model;
use std::ffi::{CStr, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::slice;
use tracing::{error, trace};

/// Evaluates the model into a caller-sized flux buffer.
///
/// `flux` must hold exactly `n_energy - 1` values; they are reset to `0.0`
/// before evaluation. Null pointers are accepted only with a zero length.
/// Rejected arguments are logged to stderr and leave `flux` untouched; a
/// failed evaluation leaves it zeroed.
///
/// # Safety
///
/// - `energy` must be valid for reads of `n_energy` doubles (or null if `n_energy` is 0)
/// - `params` must be valid for reads of `n_params` doubles (or null if `n_params` is 0)
/// - `flux` must be valid for reads and writes of `n_flux` doubles (or null if `n_flux` is 0)
///   and must not overlap `energy` or `params`
/// - `init_string` must be null or point to a NUL-terminated string
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn pyapec_info_c(
    energy: *const f64,
    n_energy: usize,
    params: *const f64,
    n_params: usize,
    spectrum_number: c_int,
    flux: *mut f64,
    n_flux: usize,
    init_string: *const c_char,
) {
    logging::init();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if n_flux != n_energy.saturating_sub(1) {
            error!(n_energy, n_flux, "Flux array must have one element per energy bin");
            return;
        }

        // SAFETY: the caller guarantees each pointer/length pair per the
        // contract above; null pointers are rejected unless the length is 0.
        let buffers = unsafe {
            (
                input_slice(energy, n_energy),
                input_slice(params, n_params),
                output_slice(flux, n_flux),
            )
        };
        let (Some(energy), Some(params), Some(flux)) = buffers else {
            error!("Null array passed with a non-zero length");
            return;
        };

        let init = if init_string.is_null() {
            String::new()
        } else {
            // SAFETY: non-null and NUL-terminated per the contract above.
            unsafe { CStr::from_ptr(init_string) }
                .to_string_lossy()
                .into_owned()
        };
        trace!(spectrum_number, init_string = %init, "pyapec_info_c called");

        flux.fill(0.0);
        model::evaluate_shared(energy, params, flux);
    }));

    if outcome.is_err() {
        error!("Panic during model evaluation");
    }
}

/// # Safety
///
/// `ptr` must be null or valid for reads of `len` doubles.
unsafe fn input_slice<'a>(ptr: *const f64, len: usize) -> Option<&'a [f64]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and valid for `len` reads per the function contract.
    Some(unsafe { slice::from_raw_parts(ptr, len) })
}

/// # Safety
///
/// `ptr` must be null or valid for reads and writes of `len` doubles.
unsafe fn output_slice<'a>(ptr: *mut f64, len: usize) -> Option<&'a mut [f64]> {
    if len == 0 {
        return Some(&mut []);
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and valid for `len` reads and writes per the function contract.
    Some(unsafe { slice::from_raw_parts_mut(ptr, len) })
}
