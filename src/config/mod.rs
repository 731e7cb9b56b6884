// src/config/mod.rs

//! Plan file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate references and graph acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_plan};
pub use model::{
    ActionConfig, ConfigSection, PlanFile, RawPlanFile, RepositoryConfig, SourceBuilderConfig,
    SpecConfig,
};
