// ABOUTME: Task definition and container definition value types.
// ABOUTME: Serialize to the camelCase registration payload shown by `tideway render`.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::spec::{AWSLOGS_REGION, NetworkMode, Protocol};
use crate::types::Region;

/// An immutable task definition revision, ready to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub family: String,
    pub network_mode: NetworkMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    #[serde(rename = "containerDefinitions", serialize_with = "single_element")]
    pub container: ContainerDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub essential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<u32>,
    pub port_mappings: Vec<PortMapping>,
    pub environment: Vec<EnvironmentVariable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<LogConfiguration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    pub options: BTreeMap<String, String>,
}

impl TaskDefinition {
    /// The variant registered in `region`.
    ///
    /// Only the awslogs driver is region-specific: its `awslogs-region` option
    /// is stamped with the target region unless the operator pinned one.
    pub fn for_region(&self, region: &Region) -> TaskDefinition {
        let mut regional = self.clone();
        if let Some(logs) = regional.container.log_configuration.as_mut()
            && logs.log_driver == crate::spec::AWSLOGS_DRIVER
        {
            logs.options
                .entry(AWSLOGS_REGION.to_string())
                .or_insert_with(|| region.to_string());
        }
        regional
    }

    /// First container port, the one a load balancer forwards to.
    pub fn first_container_port(&self) -> Option<u16> {
        self.container
            .port_mappings
            .first()
            .map(|mapping| mapping.container_port)
    }
}

fn single_element<S: Serializer>(
    container: &ContainerDefinition,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    std::slice::from_ref(container).serialize(serializer)
}
