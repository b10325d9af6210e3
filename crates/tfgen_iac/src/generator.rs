//! Generic resource generation.
//!
//! Each resource kind implements [`ResourceGenerator`]: how to list its
//! records and how to map one record to a document plus declarations.
//! [`generate`] is the single driver that does everything else: directory
//! setup, per-record error isolation, file writes, registration in the
//! [`GenerationContext`] and queueing of reconciliation requests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use tfgen_hcl::Document;
use tfgen_sdk::DiscoveryClient;

use crate::context::{GenerationContext, OutputVarConfig, ReconciliationRequest, VarConfig};
use crate::error::IacResult;

/// What a generator may look at while running.
pub struct GenerationScope<'a> {
    pub client: &'a dyn DiscoveryClient,
    pub tenant_id: &'a str,
    /// Account name of the tenant, used to strip name prefixes.
    pub tenant_name: &'a str,
    /// Directory the unit's files are written to.
    pub working_dir: &'a Path,
    /// Queue reconciliation requests for generated resources.
    pub generate_tf_state: bool,
}

/// An adoptable resource: its address and the provider import id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub address: String,
    pub resource_id: String,
}

/// Everything produced for one record.
#[derive(Debug)]
pub struct GeneratedResource {
    pub file_name: String,
    pub document: Document,
    pub variables: Vec<VarConfig>,
    pub outputs: Vec<OutputVarConfig>,
    pub imports: Vec<ImportTarget>,
}

impl GeneratedResource {
    pub fn new(file_name: impl Into<String>, document: Document) -> Self {
        Self {
            file_name: file_name.into(),
            document,
            variables: Vec::new(),
            outputs: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn variable(mut self, var: VarConfig) -> Self {
        self.variables.push(var);
        self
    }

    pub fn output(mut self, output: OutputVarConfig) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn import(mut self, address: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.imports.push(ImportTarget {
            address: address.into(),
            resource_id: resource_id.into(),
        });
        self
    }
}

/// A record that could not be generated.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub record: String,
    pub error: String,
}

/// Outcome of generating one resource kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KindReport {
    pub kind: String,
    /// Number of records the discovery call returned.
    pub records: usize,
    pub files: Vec<PathBuf>,
    pub failures: Vec<RecordFailure>,
    /// Set when the kind could not be listed at all.
    pub fetch_error: Option<String>,
    pub queued_imports: usize,
}

impl KindReport {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.fetch_error.is_none() && self.failures.is_empty()
    }
}

/// Per-kind mapping from discovered records to configuration.
#[async_trait]
pub trait ResourceGenerator: Send + Sync {
    type Record: Send + Sync;

    /// Short kind name used in logs and reports (`redis`, `lb`, ...).
    fn kind(&self) -> &'static str;

    /// List the records of this kind. An error aborts this kind only.
    async fn fetch(&self, scope: &GenerationScope<'_>) -> IacResult<Vec<Self::Record>>;

    /// Name of a record for diagnostics.
    fn record_name(&self, record: &Self::Record) -> String;

    /// Build the configuration for one record. Auxiliary lookups that fail
    /// must degrade the result rather than return an error.
    async fn map_record(
        &self,
        scope: &GenerationScope<'_>,
        record: &Self::Record,
    ) -> IacResult<GeneratedResource>;
}

/// Run one generator, skipping and reporting records that fail.
pub async fn generate<G>(
    generator: &G,
    scope: &GenerationScope<'_>,
    ctx: &mut GenerationContext,
) -> KindReport
where
    G: ResourceGenerator + ?Sized,
{
    let kind = generator.kind();
    let mut report = KindReport::new(kind);

    let records = match generator.fetch(scope).await {
        Ok(records) => records,
        Err(e) => {
            warn!("Skipping {} generation: {}", kind, e);
            report.fetch_error = Some(e.to_string());
            return report;
        }
    };
    report.records = records.len();
    if records.is_empty() {
        debug!("No {} resources found", kind);
        return report;
    }

    if let Err(e) = std::fs::create_dir_all(scope.working_dir) {
        warn!("Cannot create {}: {}", scope.working_dir.display(), e);
        report.fetch_error = Some(e.to_string());
        return report;
    }

    info!("{} generation started ({} records)", kind, records.len());
    for record in &records {
        let name = generator.record_name(record);
        match emit(generator, scope, ctx, record).await {
            Ok((path, queued)) => {
                debug!("Generated {} {} -> {}", kind, name, path.display());
                report.files.push(path);
                report.queued_imports += queued;
            }
            Err(e) => {
                warn!("Skipping {} {}: {}", kind, name, e);
                report.failures.push(RecordFailure {
                    record: name,
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        "{} generation done: {} files, {} skipped",
        kind,
        report.files.len(),
        report.failures.len()
    );

    report
}

/// Generate and write one record. Nothing is registered in the context
/// unless the file was written.
async fn emit<G>(
    generator: &G,
    scope: &GenerationScope<'_>,
    ctx: &mut GenerationContext,
    record: &G::Record,
) -> IacResult<(PathBuf, usize)>
where
    G: ResourceGenerator + ?Sized,
{
    let resource = generator.map_record(scope, record).await?;
    resource.document.validate()?;

    let path = scope.working_dir.join(&resource.file_name);
    std::fs::write(&path, resource.document.to_bytes()?)?;
    ctx.track_references(&resource.document);

    for var in resource.variables {
        ctx.declare(var);
    }
    for output in resource.outputs {
        ctx.declare_output(output);
    }

    let mut queued = 0;
    if scope.generate_tf_state {
        for target in resource.imports {
            ctx.queue_reconciliation(ReconciliationRequest::new(
                target.address,
                target.resource_id,
                scope.working_dir,
            ));
            queued += 1;
        }
    }
    Ok((path, queued))
}

/// Object-safe view of a generator so a unit can hold several kinds.
#[async_trait]
pub trait KindGenerator: Send + Sync {
    async fn generate(&self, scope: &GenerationScope<'_>, ctx: &mut GenerationContext) -> KindReport;
}

#[async_trait]
impl<G: ResourceGenerator> KindGenerator for G {
    async fn generate(&self, scope: &GenerationScope<'_>, ctx: &mut GenerationContext) -> KindReport {
        generate(self, scope, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VarConfig;
    use crate::error::IacError;
    use crate::resources::testing::scope;
    use tfgen_hcl::{BlockExt, Reference};
    use tfgen_sdk::MockClient;

    struct StaticGenerator {
        records: Option<Vec<&'static str>>,
    }

    #[async_trait]
    impl ResourceGenerator for StaticGenerator {
        type Record = &'static str;

        fn kind(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _scope: &GenerationScope<'_>) -> IacResult<Vec<&'static str>> {
            self.records
                .clone()
                .ok_or_else(|| IacError::Config("listing failed".to_string()))
        }

        fn record_name(&self, record: &&'static str) -> String {
            record.to_string()
        }

        async fn map_record(
            &self,
            _scope: &GenerationScope<'_>,
            record: &&'static str,
        ) -> IacResult<GeneratedResource> {
            if *record == "broken" {
                return Err(IacError::Config("cannot map".to_string()));
            }
            let mut document = Document::new();
            document
                .add_block("resource", ["null_resource", *record])
                .set(
                    "triggers",
                    Reference::data("duplocloud_tenant_aws_kms_key", *record, "key_id").unwrap(),
                );
            if *record == "duplicate" {
                document.add_block("resource", ["null_resource", *record]);
            }
            Ok(GeneratedResource::new(format!("{}.tf", record), document)
                .variable(VarConfig::string(format!("{}_name", record), *record))
                .output(OutputVarConfig::literal(format!("{}_out", record), *record, ""))
                .import(format!("null_resource.{}", record), *record))
        }
    }

    #[tokio::test]
    async fn test_failed_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::new();
        let generator = StaticGenerator {
            records: Some(vec!["first", "broken", "duplicate", "last"]),
        };
        let mut ctx = GenerationContext::new();

        let report = generate(&generator, &scope(&client, dir.path()), &mut ctx).await;
        assert_eq!(report.records, 4);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.queued_imports, 2);
        let skipped: Vec<_> = report.failures.iter().map(|f| f.record.as_str()).collect();
        assert_eq!(skipped, vec!["broken", "duplicate"]);

        assert!(dir.path().join("first.tf").exists());
        assert!(!dir.path().join("duplicate.tf").exists());
        assert!(ctx.variable("duplicate_name").is_none());
        let names: Vec<_> = ctx.variables().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["first_name", "last_name"]);
    }

    #[tokio::test]
    async fn test_unwritable_file_is_skipped_without_registration() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("blocked.tf")).unwrap();
        let client = MockClient::new();
        let generator = StaticGenerator {
            records: Some(vec!["first", "blocked", "last"]),
        };
        let mut ctx = GenerationContext::new();

        let report = generate(&generator, &scope(&client, dir.path()), &mut ctx).await;
        assert_eq!(report.files.len(), 2);
        assert!(dir.path().join("first.tf").is_file());
        assert!(dir.path().join("last.tf").is_file());

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record, "blocked");
        assert!(!report.is_success());

        assert!(ctx.variable("blocked_name").is_none());
        assert!(ctx.output("blocked_out").is_none());
        assert!(ctx.output("last_out").is_some());
        assert!(ctx.requests().iter().all(|r| r.resource_id != "blocked"));
        assert_eq!(ctx.requests().len(), 2);
        let sources: Vec<_> = ctx.data_sources().map(|(_, name)| name).collect();
        assert_eq!(sources, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_fetch_error_aborts_kind_only() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::new();
        let mut ctx = GenerationContext::new();

        let report = generate(
            &StaticGenerator { records: None },
            &scope(&client, dir.path()),
            &mut ctx,
        )
        .await;
        assert!(!report.is_success());
        assert!(report.fetch_error.unwrap().contains("listing failed"));
        assert!(ctx.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_records_creates_no_directory() {
        let dir = tempfile::tempdir().unwrap();
        let unit_dir = dir.path().join("aws-services");
        let client = MockClient::new();
        let mut ctx = GenerationContext::new();

        let report = generate(
            &StaticGenerator {
                records: Some(Vec::new()),
            },
            &scope(&client, &unit_dir),
            &mut ctx,
        )
        .await;
        assert!(report.is_success());
        assert!(!unit_dir.exists());
    }
}
