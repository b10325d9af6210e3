//! Records returned by the management plane API.
//!
//! Every field is optional on the wire; missing fields decode to their
//! defaults so a partially populated record never fails the whole list.

use serde::{Deserialize, Serialize};

/// Enum-like wrapper the API uses for string enums (`{"Value": "http"}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StringValue {
    pub value: String,
}

impl StringValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tenant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploTenant {
    #[serde(rename = "TenantId")]
    pub tenant_id: String,
    pub account_name: String,
    #[serde(rename = "PlanID")]
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploInfrastructureConfig {
    pub name: String,
    pub account_id: String,
    pub region: String,
    pub cloud: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploTenantKmsKey {
    pub key_name: String,
    pub key_id: String,
    pub key_arn: String,
}

impl DuploTenantKmsKey {
    /// Whether `id` names this key by id or ARN.
    pub fn matches(&self, id: &str) -> bool {
        !id.is_empty() && (id == self.key_id || id == self.key_arn)
    }
}

// ---------------------------------------------------------------------------
// ElastiCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploEcacheInstance {
    pub identifier: String,
    pub arn: String,
    pub endpoint: String,
    pub cache_type: i32,
    pub size: String,
    pub replicas: i32,
    pub encryption_at_rest: bool,
    pub encryption_in_transit: bool,
    pub auth_token: String,
    #[serde(rename = "KMSKeyId")]
    pub kms_key_id: String,
    pub instance_status: String,
}

// ---------------------------------------------------------------------------
// Application load balancers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploApplicationLb {
    pub name: String,
    pub arn: String,
    #[serde(rename = "DNSName")]
    pub dns_name: String,
    pub enable_access_logs: bool,
    pub is_internal: bool,
    pub lb_type: Option<StringValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploLbSettings {
    pub load_balancer_arn: String,
    pub drop_invalid_headers: bool,
    #[serde(rename = "WebACLId")]
    pub web_acl_id: String,
    pub idle_timeout: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploLbAction {
    pub target_group_arn: String,
    #[serde(rename = "Type")]
    pub action_type: Option<StringValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploLbListener {
    pub listener_arn: String,
    pub port: i32,
    pub protocol: StringValue,
    pub default_actions: Vec<DuploLbAction>,
}

impl DuploLbListener {
    /// Target group of the first forwarding action, if any.
    pub fn target_group_arn(&self) -> Option<&str> {
        self.default_actions
            .first()
            .map(|a| a.target_group_arn.as_str())
            .filter(|arn| !arn.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploTargetGroupAttribute {
    pub key: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// ECS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploLbHealthCheckConfig {
    pub healthy_threshold_count: i32,
    pub unhealthy_threshold_count: i32,
    pub health_check_interval_seconds: i32,
    pub health_check_timeout_seconds: i32,
    pub http_success_code: String,
    pub grpc_success_code: String,
}

impl DuploLbHealthCheckConfig {
    /// True when every threshold is zero, i.e. nothing worth emitting.
    pub fn is_default(&self) -> bool {
        self.healthy_threshold_count == 0
            && self.unhealthy_threshold_count == 0
            && self.health_check_interval_seconds == 0
            && self.health_check_timeout_seconds == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploEcsServiceLbConfig {
    pub tg_count: i32,
    pub lb_type: i32,
    pub is_internal: bool,
    /// The API returns the container port as a string.
    pub port: String,
    pub external_port: i32,
    pub protocol: String,
    pub backend_protocol: String,
    #[serde(rename = "HealthCheckUrl")]
    pub health_check_url: String,
    pub certificate_arn: String,
    pub health_check_config: Option<DuploLbHealthCheckConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploEcsService {
    pub name: String,
    pub task_definition: String,
    pub replicas: i32,
    pub health_check_grace_period_seconds: i32,
    pub old_task_definition_buffer_size: i32,
    pub is_target_group_only: bool,
    #[serde(rename = "DnsPrfx")]
    pub dns_prfx: String,
    #[serde(rename = "LBConfigurations")]
    pub lb_configurations: Vec<DuploEcsServiceLbConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploEcsTaskDefinition {
    pub family: String,
    pub task_definition_arn: String,
    #[serde(rename = "Cpu")]
    pub cpu: String,
    pub memory: String,
    pub network_mode: StringValue,
    pub requires_compatibilities: Vec<String>,
    /// Passed through as structured data.
    pub volumes: Option<serde_json::Value>,
    /// Passed through as structured data.
    pub container_definitions: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// EMR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploEmrClusterSummary {
    pub name: String,
    pub arn: String,
    pub status: String,
    pub job_flow_id: String,
}

/// EMR cluster detail. Several fields carry JSON documents encoded as
/// strings (`Applications`, `Steps`, `Configurations`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuploEmrCluster {
    pub arn: String,
    pub name: String,
    pub release_label: String,
    pub status: String,
    pub log_uri: String,
    pub job_flow_id: String,
    pub custom_ami_id: String,
    pub ebs_root_volume_size: i32,
    pub step_concurrency_level: i32,
    pub scale_down_behavior: String,
    pub termination_protection: bool,
    pub keep_job_flow_alive_when_no_steps: bool,
    pub visible_to_all_users: bool,
    pub master_instance_type: String,
    pub slave_instance_type: String,
    pub instance_count: i32,
    pub zone: i32,
    pub applications: String,
    pub steps: String,
    pub configurations: String,
    pub bootstrap_actions: String,
    pub job_flow_instances_config: String,
    pub additional_info: String,
    pub managed_scaling_policy: String,
    pub instance_groups: String,
    pub instance_fleets: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ecache_instance() {
        let json = r#"{
            "Identifier": "duplo-mycache",
            "Size": "cache.t3.micro",
            "Replicas": 2,
            "EncryptionAtRest": true,
            "KMSKeyId": "arn:aws:kms:us-west-2:1:key/abc"
        }"#;
        let cache: DuploEcacheInstance = serde_json::from_str(json).unwrap();
        assert_eq!(cache.identifier, "duplo-mycache");
        assert_eq!(cache.replicas, 2);
        assert!(cache.encryption_at_rest);
        assert!(!cache.encryption_in_transit);
        assert_eq!(cache.kms_key_id, "arn:aws:kms:us-west-2:1:key/abc");
    }

    #[test]
    fn test_decode_ecs_service_with_lb_config() {
        let json = r#"{
            "Name": "api",
            "TaskDefinition": "arn:aws:ecs:td/api:3",
            "Replicas": 2,
            "LBConfigurations": [
                {"Port": "8080", "ExternalPort": 443, "Protocol": "https",
                 "HealthCheckConfig": {"HealthyThresholdCount": 3}}
            ]
        }"#;
        let svc: DuploEcsService = serde_json::from_str(json).unwrap();
        assert_eq!(svc.lb_configurations.len(), 1);
        let hc = svc.lb_configurations[0].health_check_config.as_ref().unwrap();
        assert!(!hc.is_default());
    }

    #[test]
    fn test_listener_target_group() {
        let listener = DuploLbListener {
            default_actions: vec![DuploLbAction {
                target_group_arn: "arn:tg".to_string(),
                action_type: None,
            }],
            ..Default::default()
        };
        assert_eq!(listener.target_group_arn(), Some("arn:tg"));
        assert_eq!(DuploLbListener::default().target_group_arn(), None);
    }

    #[test]
    fn test_kms_key_matches_id_or_arn() {
        let key = DuploTenantKmsKey {
            key_name: "tenant".into(),
            key_id: "abc".into(),
            key_arn: "arn:aws:kms:key/abc".into(),
        };
        assert!(key.matches("abc"));
        assert!(key.matches("arn:aws:kms:key/abc"));
        assert!(!key.matches("other"));
        assert!(!key.matches(""));
    }
}
