//! Service configuration.
//!
//! Tier-merged settings for the listener, the backing store, and the
//! resolution engine: embedded defaults, then an optional YAML file,
//! then `CONFSERVE_*` environment variables, highest tier winning
//! field-by-field.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{Config, ResolutionConfig, ServerConfig, StorageConfig};
