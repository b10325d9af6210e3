//! EMR clusters.
//!
//! Several cluster fields are JSON documents the API hands out as strings.
//! They are emitted through `jsonencode(...)` when they parse, so the file
//! holds readable structure instead of escaped text.

use async_trait::async_trait;
use tracing::{debug, warn};

use tfgen_hcl::naming::{safe_identifier, short_name, tenant_prefix};
use tfgen_hcl::{expr, Block, BlockExt, Document, Expression, Reference};
use tfgen_sdk::{DuploEmrCluster, DuploEmrClusterSummary};

use super::{address, tenant_id_local};
use crate::context::OutputVarConfig;
use crate::error::IacResult;
use crate::generator::{GeneratedResource, GenerationScope, ResourceGenerator};

pub const RESOURCE_TYPE: &str = "duplocloud_emr_cluster";
pub const NAME_NAMESPACE: &str = "duploservices";

/// Clusters in these states are gone and cannot be adopted.
const FINISHED_STATES: [&str; 3] = ["TERMINATED", "TERMINATED_WITH_ERRORS", "TERMINATING"];

#[derive(Debug, Default)]
pub struct EmrGenerator;

impl EmrGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceGenerator for EmrGenerator {
    type Record = DuploEmrClusterSummary;

    fn kind(&self) -> &'static str {
        "emr"
    }

    async fn fetch(&self, scope: &GenerationScope<'_>) -> IacResult<Vec<DuploEmrClusterSummary>> {
        let clusters = scope.client.emr_cluster_list(scope.tenant_id).await?;
        Ok(clusters
            .into_iter()
            .filter(|c| {
                let finished = FINISHED_STATES
                    .iter()
                    .any(|state| state.eq_ignore_ascii_case(&c.status));
                if finished {
                    debug!("Skipping EMR cluster {} in state {}", c.name, c.status);
                }
                !finished
            })
            .collect())
    }

    fn record_name(&self, record: &DuploEmrClusterSummary) -> String {
        record.name.clone()
    }

    async fn map_record(
        &self,
        scope: &GenerationScope<'_>,
        summary: &DuploEmrClusterSummary,
    ) -> IacResult<GeneratedResource> {
        // The detail carries everything the block needs; without it there
        // is nothing to describe.
        let cluster = scope
            .client
            .emr_cluster_get(scope.tenant_id, &summary.name)
            .await?;

        let prefix = tenant_prefix(NAME_NAMESPACE, scope.tenant_name);
        let short = short_name(&cluster.name, &prefix).to_string();
        let label = safe_identifier(&short);

        let mut doc = Document::new();
        let block = doc.add_block("resource", [RESOURCE_TYPE, label.as_str()]);
        block
            .set("tenant_id", tenant_id_local()?)
            .set("name", short.as_str());
        cluster_attributes(block, &cluster);

        let var_prefix = format!("emr_{}_", label);
        Ok(GeneratedResource::new(format!("emr-{}.tf", short), doc)
            .output(OutputVarConfig::reference(
                format!("{}arn", var_prefix),
                Reference::resource(RESOURCE_TYPE, &label, "arn")?,
                "The ARN of the EMR cluster.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}job_flow_id", var_prefix),
                Reference::resource(RESOURCE_TYPE, &label, "job_flow_id")?,
                "The job flow id of the EMR cluster.",
            ))
            .import(
                address(RESOURCE_TYPE, &label),
                format!("{}/{}", scope.tenant_id, short),
            ))
    }
}

fn cluster_attributes(block: &mut Block, cluster: &DuploEmrCluster) {
    block
        .set_non_empty("release_label", &cluster.release_label)
        .set_non_empty("log_uri", &cluster.log_uri)
        .set_non_empty("custom_ami_id", &cluster.custom_ami_id)
        .set_opt("ebs_root_volume_size", positive(cluster.ebs_root_volume_size))
        .set_opt("step_concurrency_level", positive(cluster.step_concurrency_level))
        .set_non_empty("scale_down_behavior", &cluster.scale_down_behavior)
        .set("termination_protection", cluster.termination_protection)
        .set(
            "keep_job_flow_alive_when_no_steps",
            cluster.keep_job_flow_alive_when_no_steps,
        )
        .set("visible_to_all_users", cluster.visible_to_all_users)
        .set_non_empty("master_instance_type", &cluster.master_instance_type)
        .set_non_empty("slave_instance_type", &cluster.slave_instance_type)
        .set_opt("instance_count", positive(cluster.instance_count))
        .set("zone", cluster.zone);

    let documents = [
        ("applications", &cluster.applications),
        ("configurations", &cluster.configurations),
        ("steps", &cluster.steps),
        ("bootstrap_actions", &cluster.bootstrap_actions),
        ("additional_info", &cluster.additional_info),
        ("managed_scaling_policy", &cluster.managed_scaling_policy),
        ("instance_groups", &cluster.instance_groups),
        ("instance_fleets", &cluster.instance_fleets),
    ];
    for (name, text) in documents {
        if let Some(value) = json_document(name, text) {
            block.set(name, value);
        }
    }
}

fn positive(n: i32) -> Option<i32> {
    (n > 0).then_some(n)
}

/// Parse a JSON string field; unparsable text is kept as a plain string.
fn json_document(name: &str, text: &str) -> Option<Expression> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return None;
    }
    let encoded = serde_json::from_str::<serde_json::Value>(trimmed)
        .map_err(|e| e.to_string())
        .and_then(|json| expr::json_encode(json).map_err(|e| e.to_string()));
    match encoded {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("EMR field {} is not valid JSON, kept as text: {}", name, e);
            Some(Expression::String(text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{scope, TENANT_ID};
    use tfgen_sdk::MockClient;

    fn cluster(name: &str, status: &str) -> DuploEmrCluster {
        DuploEmrCluster {
            name: name.to_string(),
            status: status.to_string(),
            release_label: "emr-6.9.0".to_string(),
            master_instance_type: "m5.xlarge".to_string(),
            instance_count: 3,
            applications: r#"[{"Name":"Spark"},{"Name":"Hive"}]"#.to_string(),
            additional_info: "{not json".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_skips_terminated_clusters() {
        let client = MockClient::new()
            .with_emr_cluster(cluster("duploservices-dev-etl", "WAITING"))
            .with_emr_cluster(cluster("duploservices-dev-old", "TERMINATED"));
        let dir = tempfile::tempdir().unwrap();

        let records = EmrGenerator::new()
            .fetch(&scope(&client, dir.path()))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "duploservices-dev-etl");
    }

    #[tokio::test]
    async fn test_cluster_document() {
        let client = MockClient::new().with_emr_cluster(cluster("duploservices-dev-etl", "WAITING"));
        let dir = tempfile::tempdir().unwrap();
        let summary = DuploEmrClusterSummary {
            name: "duploservices-dev-etl".to_string(),
            ..Default::default()
        };

        let generated = EmrGenerator::new()
            .map_record(&scope(&client, dir.path()), &summary)
            .await
            .unwrap();
        assert_eq!(generated.file_name, "emr-etl.tf");

        let block = generated
            .document
            .find("resource", &[RESOURCE_TYPE, "etl"])
            .unwrap();
        assert_eq!(block.get("name"), Some(&Expression::from("etl")));
        assert_eq!(block.get("instance_count"), Some(&Expression::from(3)));
        assert!(block.get("ebs_root_volume_size").is_none());
        assert!(block.get("steps").is_none());
        assert!(block.get("applications").is_some_and(expr::is_json_encode));
        assert_eq!(block.get("additional_info"), Some(&Expression::from("{not json")));

        let text = tfgen_hcl::to_string(&generated.document).unwrap();
        assert!(text.contains(r#"applications = jsonencode([{ "Name" = "Spark" }, { "Name" = "Hive" }])"#));

        assert_eq!(generated.imports[0].resource_id, format!("{}/etl", TENANT_ID));
        assert_eq!(generated.outputs[1].name, "emr_etl_job_flow_id");
    }

    #[tokio::test]
    async fn test_missing_detail_is_an_error() {
        let client = MockClient::new();
        let dir = tempfile::tempdir().unwrap();
        let summary = DuploEmrClusterSummary {
            name: "duploservices-dev-gone".to_string(),
            ..Default::default()
        };

        let result = EmrGenerator::new()
            .map_record(&scope(&client, dir.path()), &summary)
            .await;
        assert!(result.is_err());
    }
}
