//! Configuration module for mirror runs
//!
//! This module provides the `MirrorConfig` struct and its type-safe builder
//! for configuring a workspace mirror run with validation and sensible
//! defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{MirrorConfigBuilder, WithOutputDir, WithStartUrl};
pub use types::MirrorConfig;
