//! Configuration loading

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, load_or_default, probe_config_paths};
