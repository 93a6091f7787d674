//! The stampede binary: environment-driven configuration, the built-in
//! protocol adapters, and the default operation factory. The reusable
//! machinery (engine, metrics, pool, report) lives in the library crates.

pub mod adapters;
pub mod config;
pub mod factory;
