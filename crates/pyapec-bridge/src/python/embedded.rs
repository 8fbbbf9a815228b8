//! Bundled Python model scripts.
//!
//! The default model script is embedded at compile time with [`include_str!`]
//! and written to the app data directory by the [`runtime`] module when no
//! `script_dir` is configured. This keeps the shared library usable on its own:
//! XSPEC only needs to load it, and the script ships inside.
//!
//! ```text
//! {app_data_dir}/python/
//! └── pyapec_script.py    # pyapec(engs, params, flux) via pyatomdb's CIESession
//! ```
//!
//! [`runtime`]: crate::python::runtime

/// A single embedded Python source file.
///
/// # Example
///
/// ```rust
/// use pyapec_bridge::python::embedded::EmbeddedFile;
///
/// let file = EmbeddedFile {
///     path: "stub_model.py",
///     content: "def pyapec(engs, params, flux):\n    return flux\n",
/// };
///
/// assert!(file.content.contains("def pyapec"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedFile {
    /// File name relative to the extraction directory.
    pub path: &'static str,

    /// The complete file contents as a UTF-8 string.
    pub content: &'static str,
}

/// All bundled scripts.
pub const EMBEDDED_FILES: &[EmbeddedFile] = &[EmbeddedFile {
    path: "pyapec_script.py",
    content: include_str!("../../python/pyapec_script.py"),
}];
