// ABOUTME: Library root for tideway - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod error;
pub mod output;
pub mod provider;
pub mod publish;
pub mod spec;
pub mod task;
pub mod types;
