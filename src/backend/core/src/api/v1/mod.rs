//! V1 admin API.

pub mod routes;

pub use routes::{v1_router, V1_PREFIX};
