//! Generator configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IacError, IacResult};

/// Terraform version imports are pinned to.
pub const DEFAULT_TERRAFORM_VERSION: &str = "0.14.11";

/// How the terraform binary is provided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// A binary on the host (`terraform_binary` or `PATH`).
    #[default]
    Local,
    /// The `hashicorp/terraform` image through Docker or Podman.
    Container,
}

/// Everything one generation run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Tenant whose resources are exported.
    pub tenant_id: String,
    /// Customer folder under `tf_code_path`.
    pub customer_name: String,
    /// Root of the generated code.
    pub tf_code_path: PathBuf,
    pub tenant_project: String,
    pub aws_services_project: String,
    pub app_project: String,
    /// Adopt the generated resources into terraform state.
    pub generate_tf_state: bool,
    pub terraform_version: String,
    pub tool_mode: ToolMode,
    pub terraform_binary: Option<PathBuf>,
    /// Upper bound for each terraform command.
    pub timeout_seconds: u64,
    pub duplo_host: Option<String>,
    #[serde(skip_serializing)]
    pub duplo_token: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            customer_name: String::new(),
            tf_code_path: PathBuf::from("target"),
            tenant_project: "tenant".to_string(),
            aws_services_project: "aws-services".to_string(),
            app_project: "app".to_string(),
            generate_tf_state: false,
            terraform_version: DEFAULT_TERRAFORM_VERSION.to_string(),
            tool_mode: ToolMode::Local,
            terraform_binary: None,
            timeout_seconds: tfgen_runner::DEFAULT_TIMEOUT_SECONDS,
            duplo_host: None,
            duplo_token: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new(tenant_id: impl Into<String>, customer_name: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            customer_name: customer_name.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> IacResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> IacResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn tf_code_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tf_code_path = path.into();
        self
    }

    pub fn generate_tf_state(mut self, enabled: bool) -> Self {
        self.generate_tf_state = enabled;
        self
    }

    /// Check the fields every run needs.
    pub fn validate(&self) -> IacResult<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(IacError::Config("tenant_id is required".to_string()));
        }
        if self.customer_name.trim().is_empty() {
            return Err(IacError::Config("customer_name is required".to_string()));
        }
        if self.terraform_version.trim().is_empty() {
            return Err(IacError::Config("terraform_version must not be empty".to_string()));
        }
        Ok(())
    }

    /// `<tf_code_path>/<customer_name>/<project>`
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.tf_code_path.join(&self.customer_name).join(project)
    }

    pub fn tenant_dir(&self) -> PathBuf {
        self.project_dir(&self.tenant_project)
    }

    pub fn aws_services_dir(&self) -> PathBuf {
        self.project_dir(&self.aws_services_project)
    }

    pub fn app_dir(&self) -> PathBuf {
        self.project_dir(&self.app_project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_dirs() {
        let config = GeneratorConfig::new("t-123", "acme");
        assert_eq!(config.terraform_version, "0.14.11");
        assert!(!config.generate_tf_state);
        assert_eq!(config.tenant_dir(), PathBuf::from("target/acme/tenant"));
        assert_eq!(config.aws_services_dir(), PathBuf::from("target/acme/aws-services"));
        assert_eq!(config.app_dir(), PathBuf::from("target/acme/app"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_tenant_and_customer() {
        assert!(matches!(
            GeneratorConfig::default().validate(),
            Err(IacError::Config(_))
        ));
        assert!(matches!(
            GeneratorConfig::new("t-123", " ").validate(),
            Err(IacError::Config(_))
        ));
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
tenant_id: t-123
customer_name: acme
generate_tf_state: true
tool_mode: container
app_project: services
"#;
        let config = GeneratorConfig::from_yaml(yaml).unwrap();
        assert!(config.generate_tf_state);
        assert_eq!(config.tool_mode, ToolMode::Container);
        assert_eq!(config.app_dir(), PathBuf::from("target/acme/services"));
        assert_eq!(config.tenant_project, "tenant");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfgen.yaml");
        std::fs::write(&path, "tenant_id: t-1\ncustomer_name: c\ntf_code_path: out\n").unwrap();

        let config = GeneratorConfig::from_file(&path).unwrap();
        assert_eq!(config.tenant_dir(), PathBuf::from("out/c/tenant"));
    }
}
