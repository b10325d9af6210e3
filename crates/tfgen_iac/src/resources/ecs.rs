//! ECS services and their task definitions.

use async_trait::async_trait;
use tracing::warn;

use tfgen_hcl::naming::safe_identifier;
use tfgen_hcl::{expr, Block, BlockExt, Document, HclResult, Reference};
use tfgen_sdk::{DuploEcsService, DuploEcsServiceLbConfig, DuploEcsTaskDefinition};

use super::{address, tenant_id_local};
use crate::error::IacResult;
use crate::generator::{GeneratedResource, GenerationScope, ResourceGenerator};

pub const TASK_DEFINITION_TYPE: &str = "duplocloud_ecs_task_definition";
pub const SERVICE_TYPE: &str = "duplocloud_ecs_service";

#[derive(Debug, Default)]
pub struct EcsGenerator;

impl EcsGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceGenerator for EcsGenerator {
    type Record = DuploEcsService;

    fn kind(&self) -> &'static str {
        "ecs"
    }

    async fn fetch(&self, scope: &GenerationScope<'_>) -> IacResult<Vec<DuploEcsService>> {
        Ok(scope.client.ecs_service_list(scope.tenant_id).await?)
    }

    fn record_name(&self, record: &DuploEcsService) -> String {
        record.name.clone()
    }

    async fn map_record(
        &self,
        scope: &GenerationScope<'_>,
        service: &DuploEcsService,
    ) -> IacResult<GeneratedResource> {
        let label = safe_identifier(&service.name);

        let task_definition = if service.task_definition.is_empty() {
            None
        } else {
            match scope
                .client
                .ecs_task_definition_get(scope.tenant_id, &service.task_definition)
                .await
            {
                Ok(td) => Some(td),
                Err(e) => {
                    warn!(
                        "Task definition {} of {} unavailable: {}",
                        service.task_definition, service.name, e
                    );
                    None
                }
            }
        };

        let mut doc = Document::new();
        if let Some(td) = &task_definition {
            task_definition_block(&mut doc, &label, td)?;
        }

        let block = doc.add_block("resource", [SERVICE_TYPE, label.as_str()]);
        block
            .set("tenant_id", tenant_id_local()?)
            .set("name", service.name.as_str());
        if task_definition.is_some() {
            block.set(
                "task_definition",
                Reference::resource(TASK_DEFINITION_TYPE, &label, "arn")?,
            );
        } else {
            block.set_non_empty("task_definition", &service.task_definition);
        }
        block.set("replicas", service.replicas);
        if service.health_check_grace_period_seconds > 0 {
            block.set(
                "health_check_grace_period_seconds",
                service.health_check_grace_period_seconds,
            );
        }
        block
            .set("old_task_definition_buffer_size", service.old_task_definition_buffer_size)
            .set("is_target_group_only", service.is_target_group_only)
            .set_non_empty("dns_prfx", &service.dns_prfx);

        for lb_config in &service.lb_configurations {
            block.add_child("load_balancer", |lb| load_balancer_block(lb, lb_config));
        }

        let mut resource = GeneratedResource::new(format!("ecs-{}.tf", service.name), doc);
        if task_definition.is_some() {
            resource = resource.import(
                address(TASK_DEFINITION_TYPE, &label),
                format!(
                    "subscriptions/{}/EcsTaskDefinition/{}",
                    scope.tenant_id, service.task_definition
                ),
            );
        }
        Ok(resource.import(
            address(SERVICE_TYPE, &label),
            format!("v2/subscriptions/{}/EcsServiceApiV2/{}", scope.tenant_id, service.name),
        ))
    }
}

fn task_definition_block(doc: &mut Document, label: &str, td: &DuploEcsTaskDefinition) -> HclResult<()> {
    let block = doc.add_block("resource", [TASK_DEFINITION_TYPE, label]);
    block
        .set("tenant_id", tenant_id_local()?)
        .set("family", td.family.as_str())
        .set("cpu", td.cpu.as_str())
        .set("memory", td.memory.as_str())
        .set("network_mode", td.network_mode.value.as_str());
    if !td.requires_compatibilities.is_empty() {
        block.set(
            "requires_compatibilities",
            expr::strings(td.requires_compatibilities.iter().cloned()),
        );
    }
    if let Some(volumes) = non_empty_json(td.volumes.as_ref()) {
        block.set("volumes", expr::json_encode(volumes.clone())?);
    }
    if let Some(containers) = non_empty_json(td.container_definitions.as_ref()) {
        block.set("container_definitions", expr::json_encode(containers.clone())?);
    }
    Ok(())
}

fn load_balancer_block(block: &mut Block, config: &DuploEcsServiceLbConfig) {
    block
        .set("target_group_count", config.tg_count)
        .set("lb_type", config.lb_type)
        .set("is_internal", config.is_internal)
        .set("port", expr::coerce_number(&config.port))
        .set("external_port", config.external_port)
        .set("protocol", config.protocol.as_str())
        .set("backend_protocol", config.backend_protocol.as_str())
        .set("health_check_url", config.health_check_url.as_str())
        .set("certificate_arn", config.certificate_arn.as_str());

    let Some(health) = config.health_check_config.as_ref().filter(|h| !h.is_default()) else {
        return;
    };
    block.add_child("health_check_config", |check| {
        check
            .set("healthy_threshold_count", health.healthy_threshold_count)
            .set("unhealthy_threshold_count", health.unhealthy_threshold_count)
            .set("health_check_interval_seconds", health.health_check_interval_seconds)
            .set("health_check_timeout_seconds", health.health_check_timeout_seconds)
            .set_non_empty("http_success_code", &health.http_success_code)
            .set_non_empty("grpc_success_code", &health.grpc_success_code);
    });
}

/// Null, empty arrays and empty objects carry nothing worth emitting.
fn non_empty_json(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    value.filter(|v| match v {
        serde_json::Value::Null => false,
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    })
}
