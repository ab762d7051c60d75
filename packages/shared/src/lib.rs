//! Shared utilities for Hiroba.
//!
//! Logger initialisation and JST time helpers used by the server binary,
//! its library code and its tests.

pub mod logger;
pub mod time;
