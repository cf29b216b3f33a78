//! Core application functionality
//!
//! This module contains the batch-run plumbing:
//! - CLI argument parsing and validation
//! - Build settings and their JSON config file
//! - The run orchestration that wires scanning, resolution, assembly,
//!   and reporting together

pub mod app;
pub mod cli;
pub mod settings;

// Simple, clear re-exports
pub use cli::CliArgs;
pub use settings::BuildSettings;
