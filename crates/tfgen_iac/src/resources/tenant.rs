//! The tenant itself and its configuration.

use async_trait::async_trait;
use tracing::warn;

use tfgen_hcl::{BlockExt, Document, Expression, Reference};
use tfgen_sdk::{DuploInfrastructureConfig, DuploTenant};

use super::address;
use crate::context::{OutputVarConfig, VarConfig, VarType};
use crate::error::IacResult;
use crate::generator::{GeneratedResource, GenerationScope, ResourceGenerator};

pub const TENANT_TYPE: &str = "duplocloud_tenant";
pub const TENANT_CONFIG_TYPE: &str = "duplocloud_tenant_config";
pub const TENANT_LABEL: &str = "tenant";
pub const TENANT_CONFIG_LABEL: &str = "tenant-config";
pub const FILE_NAME: &str = "tenant.tf";

/// The resolved tenant plus its infrastructure, when that could be read.
#[derive(Debug, Clone)]
pub struct TenantRecord {
    pub tenant: DuploTenant,
    pub infrastructure: Option<DuploInfrastructureConfig>,
}

/// Generates `tenant.tf` for a tenant that was already resolved.
#[derive(Debug)]
pub struct TenantGenerator {
    tenant: DuploTenant,
}

impl TenantGenerator {
    pub fn new(tenant: DuploTenant) -> Self {
        Self { tenant }
    }
}

#[async_trait]
impl ResourceGenerator for TenantGenerator {
    type Record = TenantRecord;

    fn kind(&self) -> &'static str {
        "tenant"
    }

    async fn fetch(&self, scope: &GenerationScope<'_>) -> IacResult<Vec<TenantRecord>> {
        let infrastructure = match scope
            .client
            .infrastructure_get_config(&self.tenant.plan_id)
            .await
        {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Infrastructure {} unavailable, region omitted: {}", self.tenant.plan_id, e);
                None
            }
        };
        Ok(vec![TenantRecord {
            tenant: self.tenant.clone(),
            infrastructure,
        }])
    }

    fn record_name(&self, record: &TenantRecord) -> String {
        record.tenant.account_name.clone()
    }

    async fn map_record(
        &self,
        scope: &GenerationScope<'_>,
        record: &TenantRecord,
    ) -> IacResult<GeneratedResource> {
        let tenant = &record.tenant;

        let mut doc = Document::new();
        doc.add_block("resource", [TENANT_TYPE, TENANT_LABEL])
            .set("account_name", Reference::var("tenant_name")?)
            .set("plan_id", Reference::var("infra_name")?)
            .set("allow_deletion", true);

        doc.add_block("resource", [TENANT_CONFIG_TYPE, TENANT_CONFIG_LABEL])
            .set(
                "tenant_id",
                Reference::resource(TENANT_TYPE, TENANT_LABEL, "tenant_id")?,
            )
            .add_child("setting", |setting| {
                setting.set("key", "delete_protection").set("value", "true");
            });

        let mut resource = GeneratedResource::new(FILE_NAME, doc);
        if let Some(infra) = &record.infrastructure {
            resource = resource.variable(VarConfig::string("region", infra.region.clone()));
        }

        Ok(resource
            .variable(VarConfig::string("infra_name", tenant.plan_id.clone()))
            .variable(VarConfig::new("cert_arn", VarType::String, Expression::Null))
            .variable(VarConfig::string("tenant_name", tenant.account_name.clone()))
            .output(OutputVarConfig::reference(
                "tenant_name",
                Reference::resource(TENANT_TYPE, TENANT_LABEL, "account_name")?,
                "The tenant name",
            ))
            .output(OutputVarConfig::reference(
                "tenant_id",
                Reference::resource(TENANT_TYPE, TENANT_LABEL, "tenant_id")?,
                "The tenant ID",
            ))
            .output(OutputVarConfig::reference(
                "cert_arn",
                Reference::var("cert_arn")?,
                "The duplo plan certificate arn.",
            ))
            .import(
                address(TENANT_TYPE, TENANT_LABEL),
                format!("v2/admin/TenantV2/{}", scope.tenant_id),
            )
            .import(address(TENANT_CONFIG_TYPE, TENANT_CONFIG_LABEL), scope.tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{scope, TENANT_ID};
    use tfgen_sdk::{ClientError, MockClient};

    fn tenant() -> DuploTenant {
        DuploTenant {
            tenant_id: TENANT_ID.to_string(),
            account_name: "dev".to_string(),
            plan_id: "nonprod".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tenant_document() {
        let client = MockClient::new().with_infrastructure(DuploInfrastructureConfig {
            name: "nonprod".to_string(),
            region: "us-west-2".to_string(),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let scope = scope(&client, dir.path());
        let generator = TenantGenerator::new(tenant());

        let records = generator.fetch(&scope).await.unwrap();
        let generated = generator.map_record(&scope, &records[0]).await.unwrap();

        let text = tfgen_hcl::to_string(&generated.document).unwrap();
        assert_eq!(
            text,
            concat!(
                "resource \"duplocloud_tenant\" \"tenant\" {\n",
                "  account_name = var.tenant_name\n",
                "  plan_id = var.infra_name\n",
                "  allow_deletion = true\n",
                "}\n",
                "\n",
                "resource \"duplocloud_tenant_config\" \"tenant-config\" {\n",
                "  tenant_id = duplocloud_tenant.tenant.tenant_id\n",
                "\n",
                "  setting {\n",
                "    key = \"delete_protection\"\n",
                "    value = \"true\"\n",
                "  }\n",
                "}\n",
            )
        );

        let vars: Vec<_> = generated.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(vars, vec!["region", "infra_name", "cert_arn", "tenant_name"]);
        assert_eq!(generated.variables[0].default, Expression::from("us-west-2"));
        assert_eq!(generated.imports[0].resource_id, format!("v2/admin/TenantV2/{}", TENANT_ID));
        assert_eq!(generated.imports[1].address, "duplocloud_tenant_config.tenant-config");
        assert_eq!(generated.imports[1].resource_id, TENANT_ID);
    }

    #[tokio::test]
    async fn test_missing_infrastructure_omits_region() {
        let client = MockClient::new().fail(
            "infrastructure_get_config",
            ClientError::not_found("infrastructure"),
        );
        let dir = tempfile::tempdir().unwrap();
        let scope = scope(&client, dir.path());
        let generator = TenantGenerator::new(tenant());

        let records = generator.fetch(&scope).await.unwrap();
        assert!(records[0].infrastructure.is_none());
        let generated = generator.map_record(&scope, &records[0]).await.unwrap();
        assert!(generated.variables.iter().all(|v| v.name != "region"));
        assert_eq!(generated.document.blocks().len(), 2);
    }
}
