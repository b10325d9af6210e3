//! Per-unit accumulator of variables, outputs and reconciliation requests.
//!
//! Generators for one unit of work share a single [`GenerationContext`].
//! Declarations are keyed by name: the first declaration fixes the position
//! in the flushed document and the last one provides the value, so flushing
//! the same declarations always produces the same bytes.
//!
//! Besides `variables.tf` and `outputs.tf`, each unit gets a `main.tf` with
//! the provider requirement, the tenant locals the resource files refer to
//! and one block per data source they read.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tfgen_hcl::{expr, BlockExt, Document, Expression, HclResult, Reference};

use crate::error::IacResult;

pub const MAIN_FILE: &str = "main.tf";
pub const VARIABLES_FILE: &str = "variables.tf";
pub const OUTPUTS_FILE: &str = "outputs.tf";

pub const PROVIDER_NAME: &str = "duplocloud";
pub const PROVIDER_SOURCE: &str = "duplocloud/duplocloud";
pub const PROVIDER_VERSION: &str = ">= 0.10.0";

/// Declared terraform type of an input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    String,
    Number,
    Bool,
}

impl VarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An input variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarConfig {
    pub name: String,
    pub var_type: VarType,
    pub default: Expression,
    pub description: Option<String>,
}

impl VarConfig {
    pub fn new(name: impl Into<String>, var_type: VarType, default: impl Into<Expression>) -> Self {
        Self {
            name: name.into(),
            var_type,
            default: default.into(),
            description: None,
        }
    }

    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(name, VarType::String, Expression::String(default.into()))
    }

    pub fn number(name: impl Into<String>, default: i64) -> Self {
        Self::new(name, VarType::Number, default)
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Value of an output: a raw traversal or a quoted literal.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Reference(Reference),
    Literal(String),
}

/// An output variable.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputVarConfig {
    pub name: String,
    pub value: OutputValue,
    pub description: Option<String>,
}

impl OutputVarConfig {
    pub fn reference(name: impl Into<String>, reference: Reference, description: &str) -> Self {
        Self {
            name: name.into(),
            value: OutputValue::Reference(reference),
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
        }
    }

    pub fn literal(name: impl Into<String>, value: impl Into<String>, description: &str) -> Self {
        Self {
            name: name.into(),
            value: OutputValue::Literal(value.into()),
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
        }
    }
}

/// Ask the reconciliation driver to adopt `resource_id` as `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    /// Resource address, e.g. `duplocloud_ecache_instance.mycache`
    pub address: String,
    /// Identifier the provider's importer understands
    pub resource_id: String,
    /// Directory holding the configuration and state
    pub working_dir: PathBuf,
}

impl ReconciliationRequest {
    pub fn new(
        address: impl Into<String>,
        resource_id: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            address: address.into(),
            resource_id: resource_id.into(),
            working_dir: working_dir.into(),
        }
    }
}

/// The three documents flushed for a unit.
#[derive(Debug, Clone)]
pub struct UnitDocuments {
    pub main: Document,
    pub variables: Document,
    pub outputs: Document,
}

/// Shared accumulator for one generation unit.
#[derive(Debug, Default)]
pub struct GenerationContext {
    locals: IndexMap<String, Expression>,
    data_sources: IndexSet<(String, String)>,
    variables: IndexMap<String, VarConfig>,
    outputs: IndexMap<String, OutputVarConfig>,
    requests: Vec<ReconciliationRequest>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose `main.tf` defines `local.tenant_id` and `local.tenant_name`.
    pub fn for_tenant(tenant_id: &str, tenant_name: &str) -> Self {
        Self::new()
            .with_local("tenant_id", tenant_id)
            .with_local("tenant_name", tenant_name)
    }

    pub fn with_local(mut self, name: &str, value: impl Into<Expression>) -> Self {
        self.locals.insert(name.to_string(), value.into());
        self
    }

    /// Note the data sources a written document reads, so `main.tf`
    /// declares them.
    pub fn track_references(&mut self, document: &Document) {
        for reference in document.references() {
            if let ("data", [kind, name, ..]) = (reference.root(), reference.attrs()) {
                self.data_sources.insert((kind.clone(), name.clone()));
            }
        }
    }

    pub fn local(&self, name: &str) -> Option<&Expression> {
        self.locals.get(name)
    }

    /// `(kind, name)` of every data source referenced so far.
    pub fn data_sources(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data_sources
            .iter()
            .map(|(kind, name)| (kind.as_str(), name.as_str()))
    }

    /// Declare an input variable; a later declaration with the same name
    /// replaces the value in place.
    pub fn declare(&mut self, var: VarConfig) {
        if let Some(previous) = self.variables.insert(var.name.clone(), var) {
            debug!("Variable {} redeclared", previous.name);
        }
    }

    /// Declare an output; same replacement rule as [`declare`](Self::declare).
    pub fn declare_output(&mut self, output: OutputVarConfig) {
        if let Some(previous) = self.outputs.insert(output.name.clone(), output) {
            debug!("Output {} redeclared", previous.name);
        }
    }

    /// Queue a request; requests are reconciled in submission order.
    pub fn queue_reconciliation(&mut self, request: ReconciliationRequest) {
        self.requests.push(request);
    }

    pub fn variables(&self) -> impl Iterator<Item = &VarConfig> {
        self.variables.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OutputVarConfig> {
        self.outputs.values()
    }

    pub fn requests(&self) -> &[ReconciliationRequest] {
        &self.requests
    }

    pub fn variable(&self, name: &str) -> Option<&VarConfig> {
        self.variables.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputVarConfig> {
        self.outputs.get(name)
    }

    /// Build the main, variables and outputs documents.
    pub fn flush(&self) -> HclResult<UnitDocuments> {
        let mut main = Document::new();
        let requirement = expr::object([("source", PROVIDER_SOURCE), ("version", PROVIDER_VERSION)])?;
        main.add_block("terraform", Vec::<String>::new())
            .add_child("required_providers", |providers| {
                providers.set(PROVIDER_NAME, requirement);
            });
        if !self.locals.is_empty() {
            let locals = main.add_block("locals", Vec::<String>::new());
            for (name, value) in &self.locals {
                locals.set(name, value.clone());
            }
        }
        for (kind, name) in &self.data_sources {
            // Every tenant-scoped data source of the provider is keyed by tenant.
            main.add_block("data", [kind.as_str(), name.as_str()])
                .set("tenant_id", Reference::local("tenant_id")?);
        }

        let mut variables = Document::new();
        for var in self.variables.values() {
            let block = variables.add_block("variable", [var.name.as_str()]);
            block.set("type", Reference::new(var.var_type.as_str())?);
            block.set("default", var.default.clone());
            if let Some(description) = &var.description {
                block.set("description", description.as_str());
            }
        }

        let mut outputs = Document::new();
        for output in self.outputs.values() {
            let block = outputs.add_block("output", [output.name.as_str()]);
            match &output.value {
                OutputValue::Reference(reference) => block.set("value", reference.clone()),
                OutputValue::Literal(text) => block.set("value", text.as_str()),
            };
            if let Some(description) = &output.description {
                block.set("description", description.as_str());
            }
        }

        main.validate()?;
        variables.validate()?;
        outputs.validate()?;
        Ok(UnitDocuments {
            main,
            variables,
            outputs,
        })
    }

    /// Flush and write `main.tf`, `variables.tf` and `outputs.tf` into `dir`.
    pub fn write_to(&self, dir: &Path) -> IacResult<Vec<PathBuf>> {
        let documents = self.flush()?;
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(3);
        for (file, document) in [
            (MAIN_FILE, &documents.main),
            (VARIABLES_FILE, &documents.variables),
            (OUTPUTS_FILE, &documents.outputs),
        ] {
            let path = dir.join(file);
            std::fs::write(&path, document.to_bytes()?)?;
            written.push(path);
        }

        debug!(
            "Wrote {} variables, {} outputs and {} data sources to {}",
            self.variables.len(),
            self.outputs.len(),
            self.data_sources.len(),
            dir.display()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_declaration_wins_in_first_position() {
        let mut ctx = GenerationContext::new();
        ctx.declare(VarConfig::string("redis_cache_size", "cache.t3.micro"));
        ctx.declare(VarConfig::number("redis_cache_replicas", 1));
        ctx.declare(VarConfig::string("redis_cache_size", "cache.m5.large"));

        let names: Vec<_> = ctx.variables().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["redis_cache_size", "redis_cache_replicas"]);

        let documents = ctx.flush().unwrap();
        assert_eq!(documents.variables.blocks().len(), 2);
        let text = tfgen_hcl::to_string(&documents.variables).unwrap();
        assert!(text.contains(r#"default = "cache.m5.large""#));
        assert!(!text.contains("cache.t3.micro"));
    }

    #[test]
    fn test_flush_renders_outputs() {
        let mut ctx = GenerationContext::new();
        ctx.declare_output(OutputVarConfig::reference(
            "tenant_id",
            Reference::resource("duplocloud_tenant", "tenant", "tenant_id").unwrap(),
            "The tenant ID",
        ));
        ctx.declare_output(OutputVarConfig::literal("region", "us-west-2", ""));

        let documents = ctx.flush().unwrap();
        let text = tfgen_hcl::to_string(&documents.outputs).unwrap();
        assert_eq!(
            text,
            concat!(
                "output \"tenant_id\" {\n",
                "  value = duplocloud_tenant.tenant.tenant_id\n",
                "  description = \"The tenant ID\"\n",
                "}\n",
                "\n",
                "output \"region\" {\n",
                "  value = \"us-west-2\"\n",
                "}\n",
            )
        );
    }

    #[test]
    fn test_flush_is_repeatable() {
        let mut ctx = GenerationContext::new();
        ctx.declare(VarConfig::new("cert_arn", VarType::String, Expression::Null));
        ctx.declare(VarConfig::number("redis_a_replicas", 2));

        let first = ctx.flush().unwrap();
        let second = ctx.flush().unwrap();
        assert_eq!(first.variables.to_bytes().unwrap(), second.variables.to_bytes().unwrap());
        let text = tfgen_hcl::to_string(&first.variables).unwrap();
        assert!(text.contains("default = null"));
        assert!(text.contains("type = string"));
    }

    #[test]
    fn test_main_declares_locals_provider_and_data_sources() {
        let mut ctx = GenerationContext::for_tenant("t-1", "dev");
        let mut doc = Document::new();
        doc.add_block("resource", ["duplocloud_ecache_instance", "cache"])
            .set("tenant_id", Reference::local("tenant_id").unwrap())
            .set(
                "kms_key_id",
                Reference::data("duplocloud_tenant_aws_kms_key", "tenant_kms", "key_id").unwrap(),
            );
        ctx.track_references(&doc);
        ctx.track_references(&doc);

        let main = ctx.flush().unwrap().main;
        assert_eq!(ctx.data_sources().collect::<Vec<_>>(), vec![("duplocloud_tenant_aws_kms_key", "tenant_kms")]);
        assert_eq!(ctx.local("tenant_name"), Some(&Expression::from("dev")));

        let text = tfgen_hcl::to_string(&main).unwrap();
        assert_eq!(
            text,
            concat!(
                "terraform {\n",
                "  required_providers {\n",
                "    duplocloud = {\n",
                "      source = \"duplocloud/duplocloud\"\n",
                "      version = \">= 0.10.0\"\n",
                "    }\n",
                "  }\n",
                "}\n",
                "\n",
                "locals {\n",
                "  tenant_id = \"t-1\"\n",
                "  tenant_name = \"dev\"\n",
                "}\n",
                "\n",
                "data \"duplocloud_tenant_aws_kms_key\" \"tenant_kms\" {\n",
                "  tenant_id = local.tenant_id\n",
                "}\n",
            )
        );
    }

    #[test]
    fn test_queue_preserves_order() {
        let mut ctx = GenerationContext::new();
        ctx.queue_reconciliation(ReconciliationRequest::new("a.one", "1", "/w"));
        ctx.queue_reconciliation(ReconciliationRequest::new("a.two", "2", "/w"));
        let ids: Vec<_> = ctx.requests().iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_write_to_creates_unit_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("acme").join("tenant");
        let ctx = GenerationContext::for_tenant("t-1", "dev");

        let written = ctx.write_to(&target).unwrap();
        assert_eq!(written.len(), 3);
        for file in [MAIN_FILE, VARIABLES_FILE, OUTPUTS_FILE] {
            assert!(target.join(file).exists(), "missing {}", file);
        }
    }
}
