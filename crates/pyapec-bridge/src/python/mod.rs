//! Python interop module.
//!
//! This module handles all interactions with the embedded interpreter and
//! the model script running inside it.

pub mod conversion;
pub mod embedded;
pub mod runtime;
