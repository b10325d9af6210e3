//! Generators for each supported resource kind.

pub mod ecs;
pub mod emr;
pub mod load_balancer;
pub mod redis;
pub mod tenant;

pub use ecs::EcsGenerator;
pub use emr::EmrGenerator;
pub use load_balancer::LoadBalancerGenerator;
pub use redis::RedisGenerator;
pub use tenant::TenantGenerator;

use tfgen_hcl::{HclResult, Reference};

/// `local.tenant_id`, defined in the unit's `main.tf`.
pub(crate) fn tenant_id_local() -> HclResult<Reference> {
    Reference::local("tenant_id")
}

/// `local.tenant_name`, defined in the unit's `main.tf`.
pub(crate) fn tenant_name_local() -> HclResult<Reference> {
    Reference::local("tenant_name")
}

/// Resource address as terraform prints it: `<type>.<label>`.
pub(crate) fn address(resource_type: &str, label: &str) -> String {
    format!("{}.{}", resource_type, label)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use tfgen_sdk::MockClient;

    use crate::generator::GenerationScope;

    pub const TENANT_ID: &str = "3c0fa5d6-0b5b-4c6f-9a51-2a5d1f3c9e01";

    pub fn scope<'a>(client: &'a MockClient, dir: &'a Path) -> GenerationScope<'a> {
        GenerationScope {
            client,
            tenant_id: TENANT_ID,
            tenant_name: "dev",
            working_dir: dir,
            generate_tf_state: true,
        }
    }
}
