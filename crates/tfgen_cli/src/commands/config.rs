//! Config command and the settings shared by every command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tfgen_iac::{GeneratorConfig, ToolMode};
use tfgen_sdk::{HOST_ENV, TOKEN_ENV};

/// Settings merged onto the optional YAML file.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// YAML configuration file
    #[arg(short, long, env = "TFGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tenant whose resources are exported
    #[arg(long, env = "tenant_id")]
    pub tenant_id: Option<String>,

    /// Customer folder under the output path
    #[arg(long, env = "customer_name")]
    pub customer_name: Option<String>,

    /// Management plane URL
    #[arg(long, env = HOST_ENV)]
    pub duplo_host: Option<String>,

    /// API token
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    pub duplo_token: Option<String>,

    /// Root directory of the generated code
    #[arg(long, env = "tf_code_path")]
    pub tf_code_path: Option<PathBuf>,

    /// Import the generated resources into terraform state
    #[arg(long, env = "generate_tf_state")]
    pub generate_tf_state: bool,

    /// Terraform version used for imports
    #[arg(long, env = "terraform_version")]
    pub terraform_version: Option<String>,

    /// Terraform binary (defaults to PATH)
    #[arg(long)]
    pub terraform_binary: Option<PathBuf>,

    /// Run terraform in the hashicorp/terraform container image
    #[arg(long)]
    pub container: bool,

    /// Timeout for each terraform command, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl SettingsArgs {
    /// The file configuration with every given flag applied on top.
    pub fn resolve(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => GeneratorConfig::default(),
        };

        if let Some(tenant_id) = &self.tenant_id {
            config.tenant_id = tenant_id.clone();
        }
        if let Some(customer_name) = &self.customer_name {
            config.customer_name = customer_name.clone();
        }
        if let Some(host) = &self.duplo_host {
            config.duplo_host = Some(host.clone());
        }
        if let Some(token) = &self.duplo_token {
            config.duplo_token = Some(token.clone());
        }
        if let Some(path) = &self.tf_code_path {
            config.tf_code_path = path.clone();
        }
        if self.generate_tf_state {
            config.generate_tf_state = true;
        }
        if let Some(version) = &self.terraform_version {
            config.terraform_version = version.clone();
        }
        if let Some(binary) = &self.terraform_binary {
            config.terraform_binary = Some(binary.clone());
        }
        if self.container {
            config.tool_mode = ToolMode::Container;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    settings: SettingsArgs,
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let config = args.settings.resolve()?;

    println!("{}", serde_yaml::to_string(&config)?);
    println!("# tenant project:       {}", config.tenant_dir().display());
    println!("# aws-services project: {}", config.aws_services_dir().display());
    println!("# app project:          {}", config.app_dir().display());
    if config.duplo_token.is_some() {
        println!("# duplo_token is set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    fn settings(args: &[&str]) -> SettingsArgs {
        let mut argv = vec!["tfgen", "config"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Config(config) => config.settings,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfgen.yaml");
        std::fs::write(
            &path,
            "tenant_id: t-file\ncustomer_name: acme\ntf_code_path: out\ntimeout_seconds: 60\n",
        )
        .unwrap();

        let config = settings(&[
            "--config",
            path.to_str().unwrap(),
            "--tenant-id",
            "t-flag",
            "--container",
            "--generate-tf-state",
        ])
        .resolve()
        .unwrap();

        assert_eq!(config.tenant_id, "t-flag");
        assert_eq!(config.customer_name, "acme");
        assert_eq!(config.tf_code_path, PathBuf::from("out"));
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.tool_mode, ToolMode::Container);
        assert!(config.generate_tf_state);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = settings(&[
            "--config",
            "/nonexistent/tfgen.yaml",
            "--tenant-id",
            "t-1",
            "--customer-name",
            "acme",
        ])
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tfgen.yaml"));
    }

    #[test]
    fn test_flags_without_file() {
        let config = settings(&[
            "--tenant-id",
            "t-1",
            "--customer-name",
            "acme",
            "--tf-code-path",
            "/tmp/tf",
            "--terraform-version",
            "1.5.7",
            "--timeout",
            "30",
        ])
        .resolve()
        .unwrap();

        assert_eq!(config.terraform_version, "1.5.7");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.app_dir(), PathBuf::from("/tmp/tf/acme/app"));
    }
}
