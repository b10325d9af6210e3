//! Application load balancers, their listeners and target group attributes.

use async_trait::async_trait;
use tracing::warn;

use tfgen_hcl::naming::{safe_identifier, short_name};
use tfgen_hcl::{BlockExt, Document, Reference};
use tfgen_sdk::{DuploApplicationLb, DuploLbListener, DuploLbSettings, DuploTargetGroupAttribute};

use super::{address, tenant_id_local};
use crate::context::OutputVarConfig;
use crate::error::IacResult;
use crate::generator::{GeneratedResource, GenerationScope, ResourceGenerator};

pub const LB_TYPE: &str = "duplocloud_aws_load_balancer";
pub const LISTENER_TYPE: &str = "duplocloud_aws_load_balancer_listener";
pub const TG_ATTRIBUTES_TYPE: &str = "duplocloud_aws_target_group_attributes";
/// Namespace used to look up the load balancer name prefix.
pub const PREFIX_NAMESPACE: &str = "duplo3";

/// A load balancer with its name already stripped of the tenant prefix.
#[derive(Debug, Clone)]
pub struct LbRecord {
    pub lb: DuploApplicationLb,
    pub short_name: String,
}

#[derive(Debug, Default)]
pub struct LoadBalancerGenerator;

impl LoadBalancerGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceGenerator for LoadBalancerGenerator {
    type Record = LbRecord;

    fn kind(&self) -> &'static str {
        "lb"
    }

    async fn fetch(&self, scope: &GenerationScope<'_>) -> IacResult<Vec<LbRecord>> {
        let lbs = scope.client.application_lb_list(scope.tenant_id).await?;
        if lbs.is_empty() {
            return Ok(Vec::new());
        }

        // Without the prefix no short names can be derived.
        let prefix = scope
            .client
            .resource_prefix(PREFIX_NAMESPACE, scope.tenant_id)
            .await?;
        let prefix = format!("{}-", prefix);

        Ok(lbs
            .into_iter()
            .map(|lb| {
                let short_name = short_name(&lb.name, &prefix).to_string();
                LbRecord { lb, short_name }
            })
            .collect())
    }

    fn record_name(&self, record: &LbRecord) -> String {
        record.lb.name.clone()
    }

    async fn map_record(
        &self,
        scope: &GenerationScope<'_>,
        record: &LbRecord,
    ) -> IacResult<GeneratedResource> {
        let lb = &record.lb;
        let short = record.short_name.as_str();
        let label = safe_identifier(short);

        let settings = lookup_settings(scope, lb).await;
        let listeners = match scope
            .client
            .application_lb_listeners(scope.tenant_id, short)
            .await
        {
            Ok(listeners) => listeners,
            Err(e) => {
                warn!("Listeners of {} unavailable: {}", lb.name, e);
                Vec::new()
            }
        };

        let mut doc = Document::new();
        let block = doc.add_block("resource", [LB_TYPE, label.as_str()]);
        block
            .set("tenant_id", tenant_id_local()?)
            .set("name", short)
            .set("enable_access_logs", lb.enable_access_logs)
            .set("is_internal", lb.is_internal);
        if let Some(lb_type) = &lb.lb_type {
            block.set_non_empty("load_balancer_type", &lb_type.value);
        }
        if let Some(settings) = &settings {
            block
                .set("drop_invalid_headers", settings.drop_invalid_headers)
                .set_non_empty("web_acl_id", &settings.web_acl_id);
        }

        let mut resource = GeneratedResource::new(format!("lb-{}.tf", short), doc)
            .import(address(LB_TYPE, &label), format!("{}/{}", scope.tenant_id, short));

        for listener in &listeners {
            resource = add_listener(scope, resource, &label, short, listener).await?;
        }

        let var_prefix = format!("lb_{}_", label);
        let attr = |name: &str| Reference::resource(LB_TYPE, &label, name);
        Ok(resource
            .output(OutputVarConfig::reference(
                format!("{}fullname", var_prefix),
                attr("fullname")?,
                "The full name of the load balancer.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}arn", var_prefix),
                attr("arn")?,
                "The ARN of the load balancer.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}dns_name", var_prefix),
                attr("dns_name")?,
                "The DNS name of the load balancer.",
            )))
    }
}

async fn lookup_settings(
    scope: &GenerationScope<'_>,
    lb: &DuploApplicationLb,
) -> Option<DuploLbSettings> {
    if lb.arn.is_empty() {
        return None;
    }
    match scope
        .client
        .application_lb_settings(scope.tenant_id, &lb.arn)
        .await
    {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Settings of {} unavailable: {}", lb.name, e);
            None
        }
    }
}

/// Append a listener block and, when the target group has attributes, a
/// target group attributes block bound to it.
async fn add_listener(
    scope: &GenerationScope<'_>,
    mut resource: GeneratedResource,
    lb_label: &str,
    lb_short: &str,
    listener: &DuploLbListener,
) -> IacResult<GeneratedResource> {
    let listener_label = format!("{}_listener_{}", lb_label, listener.port);
    let tg_arn = listener.target_group_arn();

    let block = resource
        .document
        .add_block("resource", [LISTENER_TYPE, listener_label.as_str()]);
    block
        .set("tenant_id", tenant_id_local()?)
        .set("load_balancer_name", Reference::resource(LB_TYPE, lb_label, "name")?)
        .set("protocol", listener.protocol.value.as_str())
        .set("port", listener.port);
    if let Some(arn) = tg_arn {
        block.set("target_group_arn", arn);
    }

    if !listener.listener_arn.is_empty() {
        resource = resource.import(
            address(LISTENER_TYPE, &listener_label),
            format!("{}/{}/{}", scope.tenant_id, lb_short, listener.listener_arn),
        );
    }

    let Some(arn) = tg_arn else {
        return Ok(resource);
    };
    let attributes = match scope.client.target_group_attributes(scope.tenant_id, arn).await {
        Ok(attributes) => attributes,
        Err(e) => {
            warn!("Target group attributes of {} unavailable: {}", arn, e);
            Vec::new()
        }
    };
    let attributes: Vec<&DuploTargetGroupAttribute> = attributes
        .iter()
        .filter(|a| !a.key.is_empty() && !a.value.is_empty())
        .collect();
    if attributes.is_empty() {
        return Ok(resource);
    }

    let tg_label = format!("{}_tg_attributes", listener_label);
    let block = resource
        .document
        .add_block("resource", [TG_ATTRIBUTES_TYPE, tg_label.as_str()]);
    block.set("tenant_id", tenant_id_local()?).set(
        "target_group_arn",
        Reference::resource(LISTENER_TYPE, &listener_label, "target_group_arn")?,
    );
    for attribute in attributes {
        block.add_child("dimension", |dimension| {
            dimension
                .set("key", attribute.key.as_str())
                .set("value", attribute.value.as_str());
        });
    }

    Ok(resource.import(
        address(TG_ATTRIBUTES_TYPE, &tg_label),
        format!("{}/{}", scope.tenant_id, arn),
    ))
}
