//! Subcommand implementations.

pub mod config;
pub mod entries;
pub mod health;
pub mod invalidate;
pub mod keys;
pub mod maintenance;
pub mod stats;
pub mod warm;
