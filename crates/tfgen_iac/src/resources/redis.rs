//! ElastiCache (Redis) instances.

use async_trait::async_trait;
use tracing::warn;

use tfgen_hcl::naming::{safe_identifier, short_name};
use tfgen_hcl::{expr, BlockExt, Document, Reference};
use tfgen_sdk::{DuploEcacheInstance, DuploTenantKmsKey};

use super::{address, tenant_id_local, tenant_name_local};
use crate::context::{OutputVarConfig, VarConfig};
use crate::error::IacResult;
use crate::generator::{GeneratedResource, GenerationScope, ResourceGenerator};

pub const RESOURCE_TYPE: &str = "duplocloud_ecache_instance";
pub const VAR_PREFIX: &str = "redis_";
/// Prefix the platform puts in front of every cache identifier.
pub const NAME_PREFIX: &str = "duplo-";

/// A cache instance together with the tenant's KMS key, if it could be read.
#[derive(Debug, Clone)]
pub struct RedisRecord {
    pub instance: DuploEcacheInstance,
    pub tenant_kms: Option<DuploTenantKmsKey>,
}

#[derive(Debug, Default)]
pub struct RedisGenerator;

impl RedisGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceGenerator for RedisGenerator {
    type Record = RedisRecord;

    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn fetch(&self, scope: &GenerationScope<'_>) -> IacResult<Vec<RedisRecord>> {
        let instances = scope.client.ecache_instance_list(scope.tenant_id).await?;
        if instances.is_empty() {
            return Ok(Vec::new());
        }

        let tenant_kms = match scope.client.tenant_kms_key(scope.tenant_id).await {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Tenant KMS key unavailable, kms_key_id emitted as literal: {}", e);
                None
            }
        };

        Ok(instances
            .into_iter()
            .map(|instance| RedisRecord {
                instance,
                tenant_kms: tenant_kms.clone(),
            })
            .collect())
    }

    fn record_name(&self, record: &RedisRecord) -> String {
        record.instance.identifier.clone()
    }

    async fn map_record(
        &self,
        scope: &GenerationScope<'_>,
        record: &RedisRecord,
    ) -> IacResult<GeneratedResource> {
        let redis = &record.instance;
        let short = short_name(&redis.identifier, NAME_PREFIX);
        let label = safe_identifier(short);
        let var_prefix = format!("{}{}_", VAR_PREFIX, label);
        let replicas_var = format!("{}replicas", var_prefix);
        let size_var = format!("{}size", var_prefix);

        let mut doc = Document::new();
        let block = doc.add_block("resource", [RESOURCE_TYPE, label.as_str()]);
        block
            .set("tenant_id", tenant_id_local()?)
            .set("name", expr::interpolate(&format!("{}-", short), &tenant_name_local()?)?)
            .set("cache_type", redis.cache_type)
            .set("replicas", Reference::var(&replicas_var)?)
            .set("size", Reference::var(&size_var)?)
            .set("encryption_at_rest", redis.encryption_at_rest)
            .set("encryption_in_transit", redis.encryption_in_transit)
            .set_non_empty("auth_token", &redis.auth_token);

        if !redis.kms_key_id.is_empty() {
            match &record.tenant_kms {
                Some(kms) if kms.matches(&redis.kms_key_id) => {
                    block.set(
                        "kms_key_id",
                        Reference::data("duplocloud_tenant_aws_kms_key", "tenant_kms", "key_id")?,
                    );
                }
                _ => {
                    block.set("kms_key_id", redis.kms_key_id.as_str());
                }
            }
        }

        let addr = address(RESOURCE_TYPE, &label);
        let attr = |name: &str| Reference::resource(RESOURCE_TYPE, &label, name);

        Ok(GeneratedResource::new(format!("redis-{}.tf", short), doc)
            .variable(VarConfig::number(replicas_var, i64::from(redis.replicas)))
            .variable(VarConfig::string(size_var, redis.size.clone()))
            .output(OutputVarConfig::reference(
                format!("{}fullname", var_prefix),
                attr("identifier")?,
                "The full name of the elasticache instance.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}arn", var_prefix),
                attr("arn")?,
                "The ARN of the elasticache instance.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}endpoint", var_prefix),
                attr("endpoint")?,
                "The endpoint of the elasticache instance.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}host", var_prefix),
                attr("host")?,
                "The DNS hostname of the elasticache instance.",
            ))
            .output(OutputVarConfig::reference(
                format!("{}port", var_prefix),
                attr("port")?,
                "The listening port of the elasticache instance.",
            ))
            .import(
                addr,
                format!("v2/subscriptions/{}/ECacheDBInstance/{}", scope.tenant_id, short),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{scope, TENANT_ID};
    use tfgen_hcl::Expression;
    use tfgen_sdk::MockClient;

    fn instance() -> DuploEcacheInstance {
        DuploEcacheInstance {
            identifier: "duplo-mycache".to_string(),
            size: "cache.t3.micro".to_string(),
            replicas: 1,
            encryption_at_rest: true,
            kms_key_id: "arn:aws:kms:us-west-2:1:key/abc".to_string(),
            ..Default::default()
        }
    }

    fn kms() -> DuploTenantKmsKey {
        DuploTenantKmsKey {
            key_name: "tenant".to_string(),
            key_id: "abc".to_string(),
            key_arn: "arn:aws:kms:us-west-2:1:key/abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cache_block_and_declarations() {
        let client = MockClient::new();
        let dir = tempfile::tempdir().unwrap();
        let record = RedisRecord {
            instance: instance(),
            tenant_kms: Some(kms()),
        };

        let generated = RedisGenerator::new()
            .map_record(&scope(&client, dir.path()), &record)
            .await
            .unwrap();

        assert_eq!(generated.file_name, "redis-mycache.tf");
        let text = tfgen_hcl::to_string(&generated.document).unwrap();
        assert!(text.starts_with(r#"resource "duplocloud_ecache_instance" "mycache" {"#));
        assert!(text.contains(r#""mycache-${local.tenant_name}""#));
        assert!(text.contains("size = var.redis_mycache_size"));
        assert!(text.contains("kms_key_id = data.duplocloud_tenant_aws_kms_key.tenant_kms.key_id"));
        assert!(!text.contains("auth_token"));

        assert_eq!(generated.variables[0].name, "redis_mycache_replicas");
        assert_eq!(generated.variables[1].name, "redis_mycache_size");
        assert_eq!(generated.variables[1].default, Expression::from("cache.t3.micro"));
        assert_eq!(generated.outputs.len(), 5);

        assert_eq!(generated.imports.len(), 1);
        assert_eq!(generated.imports[0].address, "duplocloud_ecache_instance.mycache");
        assert_eq!(
            generated.imports[0].resource_id,
            format!("v2/subscriptions/{}/ECacheDBInstance/mycache", TENANT_ID)
        );
    }

    #[tokio::test]
    async fn test_foreign_kms_key_is_literal() {
        let client = MockClient::new();
        let dir = tempfile::tempdir().unwrap();
        let mut record = RedisRecord {
            instance: instance(),
            tenant_kms: None,
        };
        record.instance.auth_token = "s3cret".to_string();

        let generated = RedisGenerator::new()
            .map_record(&scope(&client, dir.path()), &record)
            .await
            .unwrap();
        let block = generated
            .document
            .find("resource", &[RESOURCE_TYPE, "mycache"])
            .unwrap();

        assert_eq!(
            block.get("kms_key_id"),
            Some(&Expression::from("arn:aws:kms:us-west-2:1:key/abc"))
        );
        assert_eq!(block.get("auth_token"), Some(&Expression::from("s3cret")));
    }

    #[tokio::test]
    async fn test_fetch_tolerates_missing_kms_key() {
        let client = MockClient::new()
            .with_ecache_instance(instance())
            .fail("tenant_kms_key", tfgen_sdk::ClientError::not_found("kms"));
        let dir = tempfile::tempdir().unwrap();

        let records = RedisGenerator::new()
            .fetch(&scope(&client, dir.path()))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].tenant_kms.is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_kms_lookup_when_empty() {
        let client = MockClient::new();
        let dir = tempfile::tempdir().unwrap();

        let records = RedisGenerator::new()
            .fetch(&scope(&client, dir.path()))
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(!client.was_called("tenant_kms_key"));
    }
}
