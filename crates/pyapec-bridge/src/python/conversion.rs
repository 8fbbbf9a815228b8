//! Numeric conversion between Rust slices and Python sequences.
//!
//! The model function receives plain Python `list[float]` objects, not numpy
//! arrays: lists are what every script can index and slice-assign into
//! (`flux[:] = spectrum`), and they need no numpy C API on the Rust side.
//!
//! ## Data Flow: Rust → Python
//!
//! ```text
//! &[f64]  ──►  PyList::new(py, values)  ──►  list[float]
//! ```
//!
//! Each element becomes a Python `float`, which is an IEEE-754 double, so
//! values cross the boundary bit for bit.
//!
//! ## Data Flow: Python → Rust
//!
//! ```text
//! any sequence (list, tuple, numpy array)
//!       │
//!       ▼ len(), then seq[i] for i in 0..count
//!       ▼ float(seq[i])  (f64 extraction)
//! Vec<f64>
//! ```
//!
//! The read-back goes through the sequence protocol rather than requiring a
//! `list`, so a script may return a numpy array as well.

use crate::error::BridgeError;
use pyo3::prelude::*;
use pyo3::types::PyList;

/// Convert a slice of doubles into a new Python list of floats.
///
/// # Errors
///
/// Returns [`BridgeError::Python`] if the list cannot be allocated.
pub fn slice_to_list<'py>(
    py: Python<'py>,
    values: &[f64],
) -> Result<Bound<'py, PyList>, BridgeError> {
    Ok(PyList::new(py, values.iter().copied())?)
}

/// Read the first `count` elements of a Python sequence as doubles.
///
/// Elements past `count` are ignored.
///
/// # Errors
///
/// Returns [`BridgeError::Conversion`] if the object has no length, holds fewer
/// than `count` elements, or an element cannot be converted to `float`.
pub fn read_bins(seq: &Bound<'_, PyAny>, count: usize) -> Result<Vec<f64>, BridgeError> {
    let len = seq.len().map_err(|e| {
        BridgeError::Conversion(format!(
            "returned object of type '{}' is not a sequence: {}",
            type_name(seq),
            e
        ))
    })?;

    if len < count {
        return Err(BridgeError::Conversion(format!(
            "returned sequence has {} elements, expected at least {}",
            len, count
        )));
    }

    let mut bins = Vec::with_capacity(count);
    for i in 0..count {
        let value = seq
            .get_item(i)
            .and_then(|item| item.extract::<f64>())
            .map_err(|e| {
                BridgeError::Conversion(format!("element {} is not a float: {}", i, e))
            })?;
        bins.push(value);
    }

    Ok(bins)
}

/// Render a Python exception as `"TypeName: message"`.
pub fn describe_python_error(py: Python<'_>, err: &PyErr) -> String {
    let error_type = err
        .get_type(py)
        .qualname()
        .map(|s| s.to_string())
        .unwrap_or_default();

    let message = err.value(py).to_string();

    if error_type.is_empty() {
        message
    } else {
        format!("{}: {}", error_type, message)
    }
}

/// Print the exception and its traceback to `sys.stderr`.
///
/// This is the embedded counterpart of `PyErr_Print`, so the script author
/// sees the same traceback they would get from running the script directly.
pub fn print_python_error(py: Python<'_>, err: &PyErr) {
    err.display(py);
}

fn type_name(obj: &Bound<'_, PyAny>) -> String {
    obj.get_type()
        .qualname()
        .map(|s| s.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}
