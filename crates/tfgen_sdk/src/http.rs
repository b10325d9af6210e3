//! HTTP implementation of [`DiscoveryClient`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, trace};

use crate::client::DiscoveryClient;
use crate::error::{ClientError, ClientResult};
use crate::models::*;

/// Environment variable holding the management plane URL.
pub const HOST_ENV: &str = "duplo_host";
/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "duplo_token";

/// Discovery client talking to the management plane REST API.
pub struct HttpClient {
    host: String,
    token: String,
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client for `host` authenticating with a bearer `token`.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> ClientResult<Self> {
        let host = host.into();
        let token = token.into();
        if host.is_empty() {
            return Err(ClientError::NotConfigured("host is empty".to_string()));
        }
        if token.is_empty() {
            return Err(ClientError::NotConfigured("token is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ClientError::NotConfigured(e.to_string()))?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Create a client from the `duplo_host` / `duplo_token` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let host = std::env::var(HOST_ENV)
            .map_err(|_| ClientError::NotConfigured(format!("{} is not set", HOST_ENV)))?;
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| ClientError::NotConfigured(format!("{} is not set", TOKEN_ENV)))?;
        Self::new(host, token)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path.trim_start_matches('/'))
    }

    async fn send(&self, api: &str, request: reqwest::RequestBuilder) -> ClientResult<String> {
        let response = request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ClientError::transport(api, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(api, e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::from_status(api, status.as_u16(), body));
        }
        trace!("{}: {} bytes", api, body.len());
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(api: &str, body: &str) -> ClientResult<T> {
        serde_json::from_str(body).map_err(|e| ClientError::Decode {
            api: api.to_string(),
            message: e.to_string(),
        })
    }

    fn is_null(body: &str) -> bool {
        let body = body.trim();
        body.is_empty() || body == "null"
    }

    /// GET a single object; an empty or `null` body means not found.
    async fn get_object<T: DeserializeOwned>(&self, api: &str, path: &str) -> ClientResult<T> {
        debug!("{}: GET {}", api, path);
        let body = self.send(api, self.client.get(self.url(path))).await?;
        if Self::is_null(&body) {
            return Err(ClientError::not_found(api));
        }
        Self::decode(api, &body)
    }

    /// GET a list; an empty or `null` body is an empty list.
    async fn get_list<T: DeserializeOwned>(&self, api: &str, path: &str) -> ClientResult<Vec<T>> {
        debug!("{}: GET {}", api, path);
        let body = self.send(api, self.client.get(self.url(path))).await?;
        if Self::is_null(&body) {
            return Ok(Vec::new());
        }
        let list: Option<Vec<T>> = Self::decode(api, &body)?;
        Ok(list.unwrap_or_default())
    }

    /// POST a query document and decode the response.
    async fn post_query<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        api: &str,
        path: &str,
        query: &B,
    ) -> ClientResult<T> {
        debug!("{}: POST {}", api, path);
        let body = self
            .send(api, self.client.post(self.url(path)).json(query))
            .await?;
        if Self::is_null(&body) {
            return Ok(T::default());
        }
        Self::decode(api, &body)
    }
}

#[async_trait]
impl DiscoveryClient for HttpClient {
    async fn tenant_get(&self, tenant_id: &str) -> ClientResult<DuploTenant> {
        self.get_object(
            &format!("TenantGet({})", tenant_id),
            &format!("v2/admin/TenantV2/{}", tenant_id),
        )
        .await
    }

    async fn infrastructure_get_config(&self, infra_name: &str) -> ClientResult<DuploInfrastructureConfig> {
        self.get_object(
            &format!("InfrastructureGetConfig({})", infra_name),
            &format!("v2/admin/InfrastructureV2/{}", infra_name),
        )
        .await
    }

    async fn resource_prefix(&self, namespace: &str, tenant_id: &str) -> ClientResult<String> {
        self.get_object(
            &format!("ResourcePrefix({}, {})", namespace, tenant_id),
            &format!("v3/subscriptions/{}/resourcePrefix/{}", tenant_id, namespace),
        )
        .await
    }

    async fn tenant_kms_key(&self, tenant_id: &str) -> ClientResult<DuploTenantKmsKey> {
        self.get_object(
            &format!("TenantKmsKey({})", tenant_id),
            &format!("subscriptions/{}/GetTenantKmsKey", tenant_id),
        )
        .await
    }

    async fn ecache_instance_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEcacheInstance>> {
        self.get_list(
            &format!("EcacheInstanceList({})", tenant_id),
            &format!("v2/subscriptions/{}/ECacheDBInstance", tenant_id),
        )
        .await
    }

    async fn application_lb_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploApplicationLb>> {
        self.get_list(
            &format!("ApplicationLbList({})", tenant_id),
            &format!("v3/subscriptions/{}/aws/lbs", tenant_id),
        )
        .await
    }

    async fn application_lb_settings(&self, tenant_id: &str, lb_arn: &str) -> ClientResult<DuploLbSettings> {
        let api = format!("ApplicationLbSettings({}, {})", tenant_id, lb_arn);
        let settings: Option<DuploLbSettings> = self
            .post_query(
                &api,
                &format!("subscriptions/{}/GetApplicationLbSettings", tenant_id),
                &json!({ "LoadBalancerArn": lb_arn }),
            )
            .await?;
        settings.ok_or_else(|| ClientError::not_found(api))
    }

    async fn application_lb_listeners(&self, tenant_id: &str, lb_name: &str) -> ClientResult<Vec<DuploLbListener>> {
        self.get_list(
            &format!("ApplicationLbListeners({}, {})", tenant_id, lb_name),
            &format!("v3/subscriptions/{}/aws/lbListeners/{}", tenant_id, lb_name),
        )
        .await
    }

    async fn target_group_attributes(
        &self,
        tenant_id: &str,
        target_group_arn: &str,
    ) -> ClientResult<Vec<DuploTargetGroupAttribute>> {
        let list: Option<Vec<DuploTargetGroupAttribute>> = self
            .post_query(
                &format!("TargetGroupAttributes({}, {})", tenant_id, target_group_arn),
                &format!("subscriptions/{}/GetTargetGroupAttributes", tenant_id),
                &json!({ "TargetGroupArn": target_group_arn }),
            )
            .await?;
        Ok(list.unwrap_or_default())
    }

    async fn ecs_service_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEcsService>> {
        self.get_list(
            &format!("EcsServiceList({})", tenant_id),
            &format!("v2/subscriptions/{}/EcsServiceApiV2", tenant_id),
        )
        .await
    }

    async fn ecs_task_definition_get(&self, tenant_id: &str, arn: &str) -> ClientResult<DuploEcsTaskDefinition> {
        let api = format!("EcsTaskDefinitionGet({}, {})", tenant_id, arn);
        let td: Option<DuploEcsTaskDefinition> = self
            .post_query(
                &api,
                &format!("subscriptions/{}/FindEcsTaskDefinition", tenant_id),
                &json!({ "Arn": arn }),
            )
            .await?;
        td.ok_or_else(|| ClientError::not_found(api))
    }

    async fn emr_cluster_list(&self, tenant_id: &str) -> ClientResult<Vec<DuploEmrClusterSummary>> {
        self.get_list(
            &format!("EmrClusterList({})", tenant_id),
            &format!("v3/subscriptions/{}/aws/emrCluster", tenant_id),
        )
        .await
    }

    async fn emr_cluster_get(&self, tenant_id: &str, name: &str) -> ClientResult<DuploEmrCluster> {
        self.get_object(
            &format!("EmrClusterGet({}, {})", tenant_id, name),
            &format!("v3/subscriptions/{}/aws/emrCluster/{}", tenant_id, name),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_host_and_token() {
        assert!(matches!(
            HttpClient::new("", "t"),
            Err(ClientError::NotConfigured(_))
        ));
        assert!(matches!(
            HttpClient::new("https://x.duplocloud.net", ""),
            Err(ClientError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("https://x.duplocloud.net/", "token").unwrap();
        assert_eq!(client.host(), "https://x.duplocloud.net");
        assert_eq!(
            client.url("/v2/admin/TenantV2/t1"),
            "https://x.duplocloud.net/v2/admin/TenantV2/t1"
        );
    }

    #[test]
    fn test_null_bodies() {
        assert!(HttpClient::is_null(""));
        assert!(HttpClient::is_null(" null \n"));
        assert!(!HttpClient::is_null("[]"));
    }
}
