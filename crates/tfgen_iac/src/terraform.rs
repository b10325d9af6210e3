//! Terraform commands used for state adoption.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use tfgen_runner::{RunConfig, ToolCommand, ToolHandle, ToolRunner};

use crate::config::DEFAULT_TERRAFORM_VERSION;
use crate::error::IacResult;

/// Result of a Terraform operation.
#[derive(Debug, Clone)]
pub struct TerraformResult {
    pub success: bool,
    /// Combined stdout and stderr.
    pub output: String,
    /// Stdout alone, e.g. the JSON printed by `show -json`.
    pub stdout: String,
    pub exit_code: i64,
}

/// Terraform on top of any [`ToolRunner`], pinned to one version.
#[derive(Clone)]
pub struct TerraformRunner {
    runner: Arc<dyn ToolRunner>,
    version: String,
    run_config: RunConfig,
    env: BTreeMap<String, String>,
}

impl TerraformRunner {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            version: DEFAULT_TERRAFORM_VERSION.to_string(),
            run_config: RunConfig::default(),
            env: BTreeMap::new(),
        }
    }

    /// Pin a terraform version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    /// Environment passed to every command (provider credentials).
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Make the pinned terraform available.
    pub async fn ensure(&self) -> IacResult<ToolHandle> {
        info!("Preparing terraform {}", self.version);
        Ok(self.runner.ensure_tool(&self.version).await?)
    }

    /// Run terraform init, upgrading providers.
    pub async fn init(&self, handle: &ToolHandle, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform init in {:?}", working_dir);
        self.run_command(handle, working_dir, &["init", "-upgrade", "-input=false", "-no-color"])
            .await
    }

    /// Adopt `resource_id` into state as `address`.
    pub async fn import(
        &self,
        handle: &ToolHandle,
        working_dir: &Path,
        address: &str,
        resource_id: &str,
    ) -> IacResult<TerraformResult> {
        info!("Importing {} ({})", address, resource_id);
        self.run_command(
            handle,
            working_dir,
            &["import", "-input=false", "-no-color", address, resource_id],
        )
        .await
    }

    /// Print the state as JSON.
    pub async fn show(&self, handle: &ToolHandle, working_dir: &Path) -> IacResult<TerraformResult> {
        debug!("Running terraform show in {:?}", working_dir);
        self.run_command(handle, working_dir, &["show", "-json", "-no-color"])
            .await
    }

    async fn run_command(
        &self,
        handle: &ToolHandle,
        working_dir: &Path,
        args: &[&str],
    ) -> IacResult<TerraformResult> {
        let command = ToolCommand::new(working_dir)
            .args(args.iter().copied())
            .envs(&self.env);

        debug!("Executing terraform {}", command.display_args());

        let result = self.runner.run(handle, &command, &self.run_config).await?;

        Ok(TerraformResult {
            success: result.success(),
            output: result.combined_output(),
            stdout: result.stdout,
            exit_code: result.exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfgen_runner::{MockResponse, MockRunner};

    #[tokio::test]
    async fn test_commands_and_env() {
        let mock = MockRunner::new().respond_to("show", MockResponse::success("{}"));
        let terraform = TerraformRunner::new(Arc::new(mock.clone()))
            .with_env("DUPLO_HOST", "https://example.duplocloud.net");
        let dir = Path::new("/work/tenant");

        let handle = terraform.ensure().await.unwrap();
        assert_eq!(handle.version, "0.14.11");

        terraform.init(&handle, dir).await.unwrap();
        terraform
            .import(&handle, dir, "duplocloud_tenant.tenant", "v2/admin/TenantV2/t-1")
            .await
            .unwrap();
        let shown = terraform.show(&handle, dir).await.unwrap();
        assert!(shown.success);
        assert_eq!(shown.stdout, "{}");

        assert_eq!(
            mock.commands("init"),
            vec![vec!["init", "-upgrade", "-input=false", "-no-color"]]
        );
        assert_eq!(
            mock.commands("import")[0][3..],
            ["duplocloud_tenant.tenant", "v2/admin/TenantV2/t-1"]
        );
        let calls = mock.get_calls();
        assert_eq!(
            calls[1].env.get("DUPLO_HOST").map(String::as_str),
            Some("https://example.duplocloud.net")
        );
        assert_eq!(calls[1].working_dir.as_deref(), Some(dir));
    }

    #[tokio::test]
    async fn test_failed_command_is_not_an_error() {
        let mock = MockRunner::new().add_response(MockResponse::failure(1, "Error: resource not found"));
        let terraform = TerraformRunner::new(Arc::new(mock)).with_version("1.5.7");

        let handle = terraform.ensure().await.unwrap();
        let result = terraform
            .import(&handle, Path::new("/w"), "a.b", "id")
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("resource not found"));
    }
}
