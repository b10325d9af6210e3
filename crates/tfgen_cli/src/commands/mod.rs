//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod config;
pub mod generate;

/// tfgen - Terraform generator for DuploCloud tenants
#[derive(Parser)]
#[command(name = "tfgen")]
#[command(version, about = "tfgen - Terraform generator for DuploCloud tenants")]
#[command(long_about = r#"
tfgen exports the resources of an existing DuploCloud tenant as terraform
configuration and can adopt them into terraform state.

COMMANDS:
  generate  → Generate the tenant, aws-services and app projects
  config    → Print the configuration a run would use

Settings are read from a YAML file (--config), then overridden by the
environment (tenant_id, customer_name, duplo_host, duplo_token,
tf_code_path, generate_tf_state, terraform_version) and by flags.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Generation failure (some records were skipped)
  5 - Reconciliation failure (some imports failed)
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate terraform for a tenant
    Generate(generate::GenerateArgs),

    /// Show the merged configuration
    Config(config::ConfigArgs),
}
