//! In-memory discovery client for testing.
//!
//! Serves canned records, injects failures per lookup and records every
//! call so tests can assert which auxiliary lookups were made.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::client::DiscoveryClient;
use crate::error::{ClientError, ClientResult};
use crate::models::*;

#[derive(Default)]
struct MockState {
    tenant: Option<DuploTenant>,
    infrastructure: Option<DuploInfrastructureConfig>,
    prefixes: HashMap<String, String>,
    kms_key: Option<DuploTenantKmsKey>,
    ecache_instances: Vec<DuploEcacheInstance>,
    load_balancers: Vec<DuploApplicationLb>,
    lb_settings: HashMap<String, DuploLbSettings>,
    listeners: HashMap<String, Vec<DuploLbListener>>,
    target_group_attributes: HashMap<String, Vec<DuploTargetGroupAttribute>>,
    ecs_services: Vec<DuploEcsService>,
    task_definitions: HashMap<String, DuploEcsTaskDefinition>,
    emr_clusters: Vec<DuploEmrCluster>,
    failures: HashMap<String, ClientError>,
}

/// Mock discovery client.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<RwLock<MockState>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(self, tenant: DuploTenant) -> Self {
        self.state.write().tenant = Some(tenant);
        self
    }

    pub fn with_infrastructure(self, config: DuploInfrastructureConfig) -> Self {
        self.state.write().infrastructure = Some(config);
        self
    }

    /// Prefix returned by `resource_prefix(namespace, _)`.
    pub fn with_resource_prefix(self, namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.state.write().prefixes.insert(namespace.into(), prefix.into());
        self
    }

    pub fn with_kms_key(self, key: DuploTenantKmsKey) -> Self {
        self.state.write().kms_key = Some(key);
        self
    }

    pub fn with_ecache_instance(self, instance: DuploEcacheInstance) -> Self {
        self.state.write().ecache_instances.push(instance);
        self
    }

    pub fn with_load_balancer(self, lb: DuploApplicationLb) -> Self {
        self.state.write().load_balancers.push(lb);
        self
    }

    pub fn with_lb_settings(self, lb_arn: impl Into<String>, settings: DuploLbSettings) -> Self {
        self.state.write().lb_settings.insert(lb_arn.into(), settings);
        self
    }

    /// Listeners keyed by load balancer short name.
    pub fn with_listeners(self, lb_name: impl Into<String>, listeners: Vec<DuploLbListener>) -> Self {
        self.state.write().listeners.insert(lb_name.into(), listeners);
        self
    }

    pub fn with_target_group_attributes(
        self,
        target_group_arn: impl Into<String>,
        attributes: Vec<DuploTargetGroupAttribute>,
    ) -> Self {
        self.state
            .write()
            .target_group_attributes
            .insert(target_group_arn.into(), attributes);
        self
    }

    pub fn with_ecs_service(self, service: DuploEcsService) -> Self {
        self.state.write().ecs_services.push(service);
        self
    }

    pub fn with_task_definition(self, arn: impl Into<String>, td: DuploEcsTaskDefinition) -> Self {
        self.state.write().task_definitions.insert(arn.into(), td);
        self
    }

    pub fn with_emr_cluster(self, cluster: DuploEmrCluster) -> Self {
        self.state.write().emr_clusters.push(cluster);
        self
    }

    /// Make every call to `method` (e.g. `"tenant_kms_key"`) fail.
    pub fn fail(self, method: impl Into<String>, error: ClientError) -> Self {
        self.state.write().failures.insert(method.into(), error);
        self
    }

    /// All recorded calls, formatted as `method(arg, ...)`.
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        let prefix = format!("{}(", method);
        self.calls
            .read()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    fn record(&self, method: &str, args: &[&str]) -> ClientResult<()> {
        self.calls.write().push(format!("{}({})", method, args.join(", ")));
        match self.state.read().failures.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn found<T>(method: &str, value: Option<T>) -> ClientResult<T> {
        value.ok_or_else(|| ClientError::not_found(method))
    }
}

#[async_trait]
impl DiscoveryClient for MockClient {
    async fn tenant_get(&self, tenant_id: &str) -> ClientResult<DuploTenant> {
        self.record("tenant_get", &[tenant_id])?;
        Self::found("tenant_get", self.state.read().tenant.clone())
    }

    async fn infrastructure_get_config(&self, infra_name: &str) -> ClientResult<DuploInfrastructureConfig> {
        self.record("infrastructure_get_config", &[infra_name])?;
        Self::found("infrastructure_get_config", self.state.read().infrastructure.clone())
    }

    async fn resource_prefix(&self, namespace: &str, tenant_id: &str) -> ClientResult<String> {
        self.record("resource_prefix", &[namespace, tenant_id])?;
        Self::found("resource_prefix", self.state.read().prefixes.get(namespace).cloned())
    }

    async fn tenant_kms_key(&self, tenant_id: &str) -> ClientResult<DuploTenantKmsKey> {
        self.record("tenant_kms_key", &[tenant_id])?;
        Self::found("tenant_kms_key", self.state.read().kms_key.clone())
    }

    async fn ecache_instance_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEcacheInstance>> {
        self.record("ecache_instance_list", &[tenant_id])?;
        Ok(self.state.read().ecache_instances.clone())
    }

    async fn application_lb_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploApplicationLb>> {
        self.record("application_lb_list", &[tenant_id])?;
        Ok(self.state.read().load_balancers.clone())
    }

    async fn application_lb_settings(&self, tenant_id: &str, lb_arn: &str) -> ClientResult<DuploLbSettings> {
        self.record("application_lb_settings", &[tenant_id, lb_arn])?;
        Self::found("application_lb_settings", self.state.read().lb_settings.get(lb_arn).cloned())
    }

    async fn application_lb_listeners(&self, tenant_id: &str, lb_name: &str) -> ClientResult<Vec<DuploLbListener>> {
        self.record("application_lb_listeners", &[tenant_id, lb_name])?;
        Ok(self
            .state
            .read()
            .listeners
            .get(lb_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn target_group_attributes(
        &self,
        tenant_id: &str,
        target_group_arn: &str,
    ) -> ClientResult<Vec<DuploTargetGroupAttribute>> {
        self.record("target_group_attributes", &[tenant_id, target_group_arn])?;
        Ok(self
            .state
            .read()
            .target_group_attributes
            .get(target_group_arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn ecs_service_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEcsService>> {
        self.record("ecs_service_list", &[tenant_id])?;
        Ok(self.state.read().ecs_services.clone())
    }

    async fn ecs_task_definition_get(&self, tenant_id: &str, arn: &str) -> ClientResult<DuploEcsTaskDefinition> {
        self.record("ecs_task_definition_get", &[tenant_id, arn])?;
        Self::found(
            "ecs_task_definition_get",
            self.state.read().task_definitions.get(arn).cloned(),
        )
    }

    async fn emr_cluster_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEmrClusterSummary>> {
        self.record("emr_cluster_list", &[tenant_id])?;
        Ok(self
            .state
            .read()
            .emr_clusters
            .iter()
            .map(|c| DuploEmrClusterSummary {
                name: c.name.clone(),
                arn: c.arn.clone(),
                status: c.status.clone(),
                job_flow_id: c.job_flow_id.clone(),
            })
            .collect())
    }

    async fn emr_cluster_get(&self, tenant_id: &str, name: &str) -> ClientResult<DuploEmrCluster> {
        self.record("emr_cluster_get", &[tenant_id, name])?;
        Self::found(
            "emr_cluster_get",
            self.state
                .read()
                .emr_clusters
                .iter()
                .find(|c| c.name == name)
                .cloned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_serves_and_records() {
        let client = MockClient::new()
            .with_tenant(DuploTenant {
                tenant_id: "t1".into(),
                account_name: "dev".into(),
                plan_id: "nonprod".into(),
            })
            .with_resource_prefix("duplo3", "duplo3-dev");

        assert_eq!(client.tenant_get("t1").await.unwrap().account_name, "dev");
        assert_eq!(client.resource_prefix("duplo3", "t1").await.unwrap(), "duplo3-dev");
        assert!(client.resource_prefix("other", "t1").await.unwrap_err().is_not_found());

        assert_eq!(
            client.get_calls(),
            vec![
                "tenant_get(t1)".to_string(),
                "resource_prefix(duplo3, t1)".to_string(),
                "resource_prefix(other, t1)".to_string(),
            ]
        );
        assert_eq!(client.call_count("resource_prefix"), 2);
    }

    #[tokio::test]
    async fn test_mock_client_failure_injection() {
        let client = MockClient::new().fail("tenant_kms_key", ClientError::transport("kms", "reset"));

        let err = client.tenant_kms_key("t1").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(client.was_called("tenant_kms_key"));
    }

    #[tokio::test]
    async fn test_mock_client_empty_lists() {
        let client = MockClient::new();
        assert!(client.ecache_instance_list("t1").await.unwrap().is_empty());
        assert!(client.application_lb_listeners("t1", "web").await.unwrap().is_empty());
    }
}
