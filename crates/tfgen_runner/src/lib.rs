//! # tfgen_runner
//!
//! Execution wrapper for the terraform binary used to adopt existing
//! resources into state.
//!
//! # Features
//!
//! - **Pinned versions**: `ensure_tool` verifies or pulls an exact version
//! - **Local or container**: a host binary, or `hashicorp/terraform:<version>`
//!   through Docker or Podman (auto-detected)
//! - **Bounded execution**: every command runs under a timeout
//! - **Dry-Run Mode**: log commands without executing them
//! - **Mock Runner**: for testing without terraform installed
//!
//! # Example
//!
//! ```rust,no_run
//! use tfgen_runner::{LocalRunner, RunConfig, RunnerOptions, ToolCommand, ToolRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = LocalRunner::new(RunnerOptions::default());
//!     let terraform = runner.ensure_tool("0.14.11").await?;
//!
//!     let init = ToolCommand::new("target/acme/tenant").args(["init", "-upgrade"]);
//!     let result = runner.run(&terraform, &init, &RunConfig::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod local;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{RunConfig, RunnerOptions, ToolCommand, DEFAULT_TIMEOUT_SECONDS};
pub use container::{ContainerRunner, ContainerRuntime};
pub use error::{RunnerError, RunnerResult};
pub use local::LocalRunner;
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{ExecutionResult, ToolHandle, ToolLocation, ToolRunner};
