// src/config/mod.rs

//! TOML configuration for the driver service.
//!
//! - [`model`] defines the raw (as-deserialized) and validated config
//!   types.
//! - [`loader`] reads a config file from disk.
//! - [`validate`] turns the raw config into a validated one (`TryFrom`).

pub mod loader;
pub mod model;
pub mod validate;

pub use self::loader::{default_config_path, load_and_validate, load_from_path, load_if_present};
pub use self::model::{ConfigFile, DriverSection, RawConfigFile};
