//! Discovery client trait.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::models::*;

/// Read-only access to a tenant's resources on the management plane.
///
/// List lookups return an empty vector when the API has nothing (including a
/// JSON `null` body); they only fail on real errors.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    async fn tenant_get(&self, tenant_id: &str) -> ClientResult<DuploTenant>;

    async fn infrastructure_get_config(&self, infra_name: &str) -> ClientResult<DuploInfrastructureConfig>;

    /// Resolve the naming prefix used for resources of `namespace` in a tenant
    /// (e.g. `duplo3` for load balancers). The returned value does not carry
    /// the trailing separator.
    async fn resource_prefix(&self, namespace: &str, tenant_id: &str) -> ClientResult<String>;

    async fn tenant_kms_key(&self, tenant_id: &str) -> ClientResult<DuploTenantKmsKey>;

    async fn ecache_instance_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEcacheInstance>>;

    async fn application_lb_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploApplicationLb>>;

    async fn application_lb_settings(&self, tenant_id: &str, lb_arn: &str) -> ClientResult<DuploLbSettings>;

    /// `lb_name` is the short name, without the tenant resource prefix.
    async fn application_lb_listeners(&self, tenant_id: &str, lb_name: &str) -> ClientResult<Vec<DuploLbListener>>;

    async fn target_group_attributes(
        &self,
        tenant_id: &str,
        target_group_arn: &str,
    ) -> ClientResult<Vec<DuploTargetGroupAttribute>>;

    async fn ecs_service_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEcsService>>;

    async fn ecs_task_definition_get(&self, tenant_id: &str, arn: &str) -> ClientResult<DuploEcsTaskDefinition>;

    async fn emr_cluster_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEmrClusterSummary>>;

    async fn emr_cluster_get(&self, tenant_id: &str, name: &str) -> ClientResult<DuploEmrCluster>;
}
