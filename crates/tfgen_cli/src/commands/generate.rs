//! Generate command - Export a tenant as terraform.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfgen_iac::{terraform_from_config, GeneratorConfig, Pipeline, PipelineReport};
use tfgen_runner::RunnerOptions;
use tfgen_sdk::{DiscoveryClient, HttpClient};

use super::config::SettingsArgs;
use crate::error::CliError;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Log terraform commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let config = args.settings.resolve()?;
    let client = discovery_client(&config)?;

    info!("Generating terraform for tenant {}", config.tenant_id);
    println!("🔍 Exporting tenant {}...", config.tenant_id);

    let mut pipeline = Pipeline::new(config.clone(), client);
    if config.generate_tf_state {
        let mut options = RunnerOptions::new();
        if args.dry_run {
            options = options.dry_run();
        }
        pipeline = pipeline.with_terraform(terraform_from_config(&config, options)?);
        println!(
            "🏗️  Importing into terraform state (terraform {})",
            config.terraform_version
        );
    }

    let report = pipeline.run().await?;
    print_report(&report);
    outcome(&report)
}

fn discovery_client(config: &GeneratorConfig) -> Result<Arc<dyn DiscoveryClient>> {
    let host = config.duplo_host.as_deref().unwrap_or_default();
    let token = config.duplo_token.as_deref().unwrap_or_default();
    if host.is_empty() || token.is_empty() {
        return Err(CliError::InvalidArguments(
            "duplo_host and duplo_token are required".to_string(),
        )
        .into());
    }
    Ok(Arc::new(HttpClient::new(host, token)?))
}

fn print_report(report: &PipelineReport) {
    println!(
        "\n📋 Tenant {} ({})",
        report.tenant.account_name, report.tenant.tenant_id
    );
    for unit in &report.units {
        println!("   {} → {}", unit.name, unit.working_dir.display());
        for kind in &unit.kinds {
            if let Some(error) = &kind.fetch_error {
                println!("      ❌ {}: {}", kind.kind, error);
                continue;
            }
            println!(
                "      {} {}: {} record(s), {} file(s)",
                if kind.is_success() { "✅" } else { "⚠️ " },
                kind.kind,
                kind.records,
                kind.files.len()
            );
            for failure in &kind.failures {
                println!("         - {}: {}", failure.record, failure.error);
            }
        }
        if let Some(error) = &unit.error {
            println!("      ❌ {}", error);
        }
        if let Some(reconciliation) = &unit.reconciliation {
            println!(
                "      🔗 {} imported, {} failed",
                reconciliation.succeeded(),
                reconciliation.failed()
            );
            for error in reconciliation.errors() {
                println!("         - {}", error);
            }
        }
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "\n✨ {} file(s) written in {}.{:03}s (run {})",
        report.files_written(),
        elapsed.num_seconds(),
        elapsed.num_milliseconds() % 1000,
        report.run_id
    );
}

/// Reconciliation failures take precedence over skipped records.
fn outcome(report: &PipelineReport) -> Result<()> {
    let failed: usize = report
        .units
        .iter()
        .filter_map(|u| u.reconciliation.as_ref())
        .map(|r| r.failed())
        .sum();
    if failed > 0 {
        return Err(CliError::ReconciliationFailed { failed }.into());
    }

    let skipped: usize = report
        .units
        .iter()
        .flat_map(|u| u.kinds.iter())
        .map(|k| k.failures.len() + usize::from(k.fetch_error.is_some()))
        .sum::<usize>()
        + report.units.iter().filter(|u| u.error.is_some()).count();
    if skipped > 0 {
        return Err(CliError::GenerationFailed { skipped }.into());
    }

    println!("✅ Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfgen_iac::{KindReport, RecordFailure, UnitReport};
    use tfgen_sdk::DuploTenant;

    fn report(kinds: Vec<KindReport>) -> PipelineReport {
        let now = chrono::Utc::now();
        PipelineReport {
            run_id: uuid::Uuid::new_v4(),
            tenant: DuploTenant::default(),
            started_at: now,
            finished_at: now,
            units: vec![UnitReport {
                name: "aws-services".to_string(),
                working_dir: "/tmp/aws-services".into(),
                kinds,
                files: Vec::new(),
                reconciliation: None,
                error: None,
            }],
        }
    }

    #[test]
    fn test_outcome_counts_skipped_records() {
        assert!(outcome(&report(vec![KindReport::default()])).is_ok());

        let mut kind = KindReport::default();
        kind.failures.push(RecordFailure {
            record: "duplo-mycache".to_string(),
            error: "boom".to_string(),
        });
        kind.fetch_error = Some("unreachable".to_string());

        let err = outcome(&report(vec![kind])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::GenerationFailed { skipped: 2 })
        ));
    }

    #[test]
    fn test_missing_credentials_are_invalid_arguments() {
        let config = GeneratorConfig::new("t-1", "acme");
        let err = discovery_client(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidArguments(_))
        ));
    }
}
