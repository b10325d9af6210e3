//! Runner for the official terraform image, using Docker or Podman.
//!
//! The image's entrypoint is `terraform`, so a [`ToolCommand`] maps to
//! `docker run --rm -v <dir>:/workspace -w /workspace <image> <args>`.

use std::collections::HashSet;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{RunConfig, RunnerOptions, ToolCommand};
use crate::error::{RunnerError, RunnerResult};
use crate::process;
use crate::runner::{ExecutionResult, ToolHandle, ToolLocation, ToolRunner};

/// Image the container runner pulls, tagged with the pinned version.
pub const TERRAFORM_IMAGE: &str = "hashicorp/terraform";

/// Mount point of the working directory inside the container.
pub const CONTAINER_WORKDIR: &str = "/workspace";

/// Container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    /// Get the CLI command name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// Runs terraform inside a pinned container image.
pub struct ContainerRunner {
    runtime: ContainerRuntime,
    options: RunnerOptions,
    /// Images already present locally, so each is pulled at most once.
    ready_images: Mutex<HashSet<String>>,
}

impl ContainerRunner {
    /// Create a runner with automatic runtime detection.
    pub fn new(preferred: Option<ContainerRuntime>, options: RunnerOptions) -> RunnerResult<Self> {
        let runtime = Self::detect_runtime(preferred)?;
        info!("Using container runtime: {}", runtime);
        Ok(Self::with_runtime(runtime, options))
    }

    /// Create a runner with a specific runtime.
    pub fn with_runtime(runtime: ContainerRuntime, options: RunnerOptions) -> Self {
        Self {
            runtime,
            options,
            ready_images: Mutex::new(HashSet::new()),
        }
    }

    /// Detect an available container runtime, trying `preferred` first.
    pub fn detect_runtime(preferred: Option<ContainerRuntime>) -> RunnerResult<ContainerRuntime> {
        if let Some(preferred) = preferred {
            if Self::is_runtime_available(preferred) {
                return Ok(preferred);
            }
            warn!(
                "Preferred runtime {} not available, trying alternatives",
                preferred
            );
        }

        [ContainerRuntime::Docker, ContainerRuntime::Podman]
            .into_iter()
            .find(|r| Self::is_runtime_available(*r))
            .ok_or_else(|| {
                RunnerError::ToolNotAvailable("Neither Docker nor Podman is available".to_string())
            })
    }

    fn is_runtime_available(runtime: ContainerRuntime) -> bool {
        Command::new(runtime.command())
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Image reference for a terraform version.
    pub fn image_for(version: &str) -> String {
        format!("{}:{}", TERRAFORM_IMAGE, version)
    }

    fn image_exists(&self, image: &str) -> RunnerResult<bool> {
        let status = Command::new(self.runtime.command())
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))?;
        Ok(status.success())
    }

    fn pull_image(&self, image: &str) -> RunnerResult<()> {
        info!("Pulling image: {}", image);
        process::run_simple(self.runtime.command(), &["pull", image])
            .map_err(|e| RunnerError::ImagePullFailed(format!("{}: {}", image, e)))?;
        info!("Successfully pulled: {}", image);
        Ok(())
    }

    /// Build the `run` arguments for one command.
    fn build_run_args(&self, image: &str, command: &ToolCommand) -> RunnerResult<Vec<String>> {
        let dir = command.working_dir();
        let source = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };

        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-w".to_string(),
            CONTAINER_WORKDIR.to_string(),
            "-v".to_string(),
            format!("{}:{}", source.to_string_lossy(), CONTAINER_WORKDIR),
        ];

        for (key, value) in &command.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(image.to_string());
        args.extend(command.args.iter().cloned());
        Ok(args)
    }
}

#[async_trait]
impl ToolRunner for ContainerRunner {
    async fn ensure_tool(&self, version: &str) -> RunnerResult<ToolHandle> {
        let image = Self::image_for(version);
        let location = ToolLocation::Image {
            runtime: self.runtime.to_string(),
            image: image.clone(),
        };

        if self.options.dry_run {
            info!("[DRY-RUN] Would pull: {}", image);
            return Ok(ToolHandle::new(version, location));
        }

        if self.ready_images.lock().contains(&image) {
            return Ok(ToolHandle::new(version, location));
        }

        if !self.image_exists(&image)? {
            self.pull_image(&image)?;
        }
        self.ready_images.lock().insert(image);

        Ok(ToolHandle::new(version, location))
    }

    async fn run(
        &self,
        handle: &ToolHandle,
        command: &ToolCommand,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let image = match &handle.location {
            ToolLocation::Image { image, .. } => image.clone(),
            _ => Self::image_for(&handle.version),
        };
        let args = self.build_run_args(&image, command)?;
        let cmd_str = process::format_command(self.runtime.command(), &args);
        debug!("Command: {}", cmd_str);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            return Ok(ExecutionResult::dry_run(&cmd_str));
        }

        let started_at = Utc::now();
        let (exit_code, stdout, stderr) = process::execute(
            self.runtime.command(),
            &args,
            None,
            &Default::default(),
            run_config,
        )?;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds() as u64;

        let result = ExecutionResult {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        };

        if result.success() {
            debug!("Container completed successfully in {}ms", duration_ms);
        } else {
            error!(
                "Container failed with exit code {} after {}ms",
                exit_code, duration_ms
            );
            if self.options.fail_fast {
                return Err(RunnerError::ExecutionFailed(format!(
                    "Container exited with code {}: {}",
                    exit_code,
                    result.error_summary()
                )));
            }
        }

        Ok(result)
    }
}
