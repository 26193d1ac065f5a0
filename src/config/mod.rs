// src/config/mod.rs

//! Job, app and global definitions.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load and save a config file (`loader.rs`).
//! - Validate basic invariants like unique ids (`validate.rs`).
//! - Expose definitions to the supervisor through [`ConfigStore`] (`store.rs`).

pub mod loader;
pub mod model;
pub mod store;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, save_to_path};
pub use model::{
    AppDefinition, GlobalSettings, JobDefinition, JobsConfig, RawAppConfig, RawJobsConfig,
    RUNTIME_HOME_VAR,
};
pub use store::{ConfigStore, TomlConfigStore};
pub use validate::validate_config;
