//! Orchestration of one generation run.
//!
//! A run resolves the tenant, then generates three units in a fixed order,
//! each into its own project directory with its own [`GenerationContext`]:
//!
//! | unit           | generators                    |
//! |----------------|-------------------------------|
//! | `tenant`       | tenant                        |
//! | `aws-services` | redis, load balancer, EMR     |
//! | `app`          | ECS                           |
//!
//! When state adoption is enabled, a unit's queued requests are reconciled
//! right after its files are written.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use tfgen_runner::{ContainerRunner, LocalRunner, RunConfig, RunnerOptions, ToolRunner};
use tfgen_sdk::{DiscoveryClient, DuploTenant};

use crate::config::{GeneratorConfig, ToolMode};
use crate::context::GenerationContext;
use crate::error::IacResult;
use crate::generator::{GenerationScope, KindGenerator, KindReport};
use crate::reconcile::{ReconciliationDriver, ReconciliationReport};
use crate::resources::{
    EcsGenerator, EmrGenerator, LoadBalancerGenerator, RedisGenerator, TenantGenerator,
};
use crate::terraform::TerraformRunner;

/// Environment variables the DuploCloud provider reads its credentials from.
pub const PROVIDER_HOST_ENV: &str = "DUPLO_HOST";
pub const PROVIDER_TOKEN_ENV: &str = "DUPLO_TOKEN";

/// Outcome of one unit.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub name: String,
    pub working_dir: PathBuf,
    pub kinds: Vec<KindReport>,
    /// Every file written, resource files first.
    pub files: Vec<PathBuf>,
    pub reconciliation: Option<ReconciliationReport>,
    /// Set when the main, variables or outputs file could not be written.
    pub error: Option<String>,
}

impl UnitReport {
    pub fn has_generation_failures(&self) -> bool {
        self.error.is_some() || self.kinds.iter().any(|k| !k.is_success())
    }

    pub fn has_reconciliation_failures(&self) -> bool {
        self.reconciliation
            .as_ref()
            .map(ReconciliationReport::has_failures)
            .unwrap_or(false)
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub tenant: DuploTenant,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub units: Vec<UnitReport>,
}

impl PipelineReport {
    pub fn has_generation_failures(&self) -> bool {
        self.units.iter().any(UnitReport::has_generation_failures)
    }

    pub fn has_reconciliation_failures(&self) -> bool {
        self.units.iter().any(UnitReport::has_reconciliation_failures)
    }

    pub fn files_written(&self) -> usize {
        self.units.iter().map(|u| u.files.len()).sum()
    }

    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.name == name)
    }
}

struct Unit {
    name: String,
    working_dir: PathBuf,
    generators: Vec<Box<dyn KindGenerator>>,
}

/// Generates, and optionally adopts, every supported resource of a tenant.
pub struct Pipeline {
    config: GeneratorConfig,
    client: Arc<dyn DiscoveryClient>,
    terraform: Option<TerraformRunner>,
}

impl Pipeline {
    pub fn new(config: GeneratorConfig, client: Arc<dyn DiscoveryClient>) -> Self {
        Self {
            config,
            client,
            terraform: None,
        }
    }

    /// Terraform used when `generate_tf_state` is set.
    pub fn with_terraform(mut self, terraform: TerraformRunner) -> Self {
        self.terraform = Some(terraform);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub async fn run(&self) -> IacResult<PipelineReport> {
        self.config.validate()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "Terraform generation started for tenant {}", self.config.tenant_id);

        // Everything else is named after the tenant, so this one is fatal.
        let tenant = self.client.tenant_get(&self.config.tenant_id).await?;
        info!("Tenant name: {}", tenant.account_name);

        let mut driver = match (&self.terraform, self.config.generate_tf_state) {
            (Some(terraform), true) => Some(ReconciliationDriver::new(terraform.clone())),
            (None, true) => {
                warn!("State adoption requested but no terraform runner configured");
                None
            }
            _ => None,
        };

        let mut units = Vec::new();
        for unit in self.units(&tenant) {
            units.push(self.run_unit(unit, &tenant, driver.as_mut()).await);
        }

        let report = PipelineReport {
            run_id,
            tenant,
            started_at,
            finished_at: Utc::now(),
            units,
        };
        info!(
            %run_id,
            "Terraform generation done: {} files written",
            report.files_written()
        );
        Ok(report)
    }

    fn units(&self, tenant: &DuploTenant) -> Vec<Unit> {
        vec![
            Unit {
                name: self.config.tenant_project.clone(),
                working_dir: self.config.tenant_dir(),
                generators: vec![Box::new(TenantGenerator::new(tenant.clone()))],
            },
            Unit {
                name: self.config.aws_services_project.clone(),
                working_dir: self.config.aws_services_dir(),
                generators: vec![
                    Box::new(RedisGenerator::new()),
                    Box::new(LoadBalancerGenerator::new()),
                    Box::new(EmrGenerator::new()),
                ],
            },
            Unit {
                name: self.config.app_project.clone(),
                working_dir: self.config.app_dir(),
                generators: vec![Box::new(EcsGenerator::new())],
            },
        ]
    }

    async fn run_unit(
        &self,
        unit: Unit,
        tenant: &DuploTenant,
        driver: Option<&mut ReconciliationDriver>,
    ) -> UnitReport {
        info!("Generating {} in {}", unit.name, unit.working_dir.display());
        let scope = GenerationScope {
            client: self.client.as_ref(),
            tenant_id: &self.config.tenant_id,
            tenant_name: &tenant.account_name,
            working_dir: &unit.working_dir,
            generate_tf_state: self.config.generate_tf_state,
        };

        let mut ctx = GenerationContext::for_tenant(&self.config.tenant_id, &tenant.account_name);
        let mut report = UnitReport {
            name: unit.name.clone(),
            working_dir: unit.working_dir.clone(),
            kinds: Vec::new(),
            files: Vec::new(),
            reconciliation: None,
            error: None,
        };
        for generator in &unit.generators {
            let kind = generator.generate(&scope, &mut ctx).await;
            report.files.extend(kind.files.iter().cloned());
            report.kinds.push(kind);
        }

        if report.files.is_empty() {
            info!("Nothing to generate for {}", unit.name);
            return report;
        }

        match ctx.write_to(&unit.working_dir) {
            Ok(files) => report.files.extend(files),
            Err(e) => {
                warn!("Cannot write declarations for {}: {}", unit.name, e);
                report.error = Some(e.to_string());
            }
        }

        if let Some(driver) = driver {
            if report.error.is_none() && !ctx.requests().is_empty() {
                info!("Adopting {} resources of {}", ctx.requests().len(), unit.name);
                report.reconciliation = Some(driver.run(ctx.requests()).await);
            }
        }
        report
    }
}

/// Build the terraform runner described by `config`.
pub fn terraform_from_config(
    config: &GeneratorConfig,
    options: RunnerOptions,
) -> IacResult<TerraformRunner> {
    let runner: Arc<dyn ToolRunner> = match config.tool_mode {
        ToolMode::Local => {
            let mut runner = LocalRunner::new(options);
            if let Some(binary) = &config.terraform_binary {
                runner = runner.with_binary(binary);
            }
            Arc::new(runner)
        }
        ToolMode::Container => Arc::new(ContainerRunner::new(None, options)?),
    };

    let mut terraform = TerraformRunner::new(runner)
        .with_version(&config.terraform_version)
        .with_run_config(
            RunConfig::default()
                .timeout(config.timeout_seconds)
                .stream_logs(true),
        );
    if let Some(host) = &config.duplo_host {
        terraform = terraform.with_env(PROVIDER_HOST_ENV, host);
    }
    if let Some(token) = &config.duplo_token {
        terraform = terraform.with_env(PROVIDER_TOKEN_ENV, token);
    }
    Ok(terraform)
}
