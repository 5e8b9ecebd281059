//! Health checking for the cache engine.
//!
//! The engine's `health_check` runs the round-trip probe and hands the result
//! to [`assess`]; the admin API maps the status to an HTTP code.

mod check;

pub use check::*;
