//! # tfgen_iac
//!
//! Terraform generation and state adoption for a DuploCloud tenant.
//!
//! This crate turns the records served by a [`DiscoveryClient`] into
//! terraform configuration and, when asked to, imports the existing
//! resources into terraform state.
//!
//! ## Features
//!
//! - One generator per resource kind behind the [`ResourceGenerator`] trait
//! - Per-unit variable and output registries with stable ordering
//! - A `main.tf` per unit with the provider, tenant locals and data sources
//! - Skip-and-continue per record, with failures collected in reports
//! - Reconciliation with per-request outcomes instead of aborting the run
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tfgen_iac::{GeneratorConfig, Pipeline};
//! use tfgen_sdk::HttpClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GeneratorConfig::new("3c0fa5d6-0b5b-4c6f-9a51-2a5d1f3c9e01", "acme");
//! let client = Arc::new(HttpClient::from_env()?);
//!
//! let report = Pipeline::new(config, client).run().await?;
//! println!("{} files written", report.files_written());
//! # Ok(())
//! # }
//! ```
//!
//! [`DiscoveryClient`]: tfgen_sdk::DiscoveryClient

pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod reconcile;
pub mod resources;
pub mod terraform;

pub use config::{GeneratorConfig, ToolMode, DEFAULT_TERRAFORM_VERSION};
pub use context::{
    GenerationContext, OutputValue, OutputVarConfig, ReconciliationRequest, UnitDocuments,
    VarConfig, VarType, MAIN_FILE, OUTPUTS_FILE, VARIABLES_FILE,
};
pub use error::{IacError, IacResult, ReconciliationError};
pub use generator::{
    generate, GeneratedResource, GenerationScope, ImportTarget, KindGenerator, KindReport,
    RecordFailure, ResourceGenerator,
};
pub use pipeline::{terraform_from_config, Pipeline, PipelineReport, UnitReport};
pub use reconcile::{
    ReconciliationDriver, ReconciliationOutcome, ReconciliationReport, ReconciliationState,
};
pub use terraform::{TerraformResult, TerraformRunner};
