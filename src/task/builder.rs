// ABOUTME: Builds a validated task definition from a deployment spec and image URI.
// ABOUTME: Normalizes port mappings and flattens the environment into sorted pairs.

use crate::deploy::ValidationError;
use crate::spec::{DeploymentSpec, LogSpec, PortSpec};

use super::definition::{
    ContainerDefinition, EnvironmentVariable, LogConfiguration, PortMapping, TaskDefinition,
};

/// Build the task definition shared by every region.
///
/// # Errors
///
/// Returns `ValidationError` when the image is empty, the memory settings are
/// missing or contradictory, a port mapping has no usable container port, or
/// the awslogs driver is configured without a log group.
pub fn build(spec: &DeploymentSpec, image_uri: &str) -> Result<TaskDefinition, ValidationError> {
    let image = image_uri.trim();
    if image.is_empty() {
        return Err(ValidationError::MissingImage);
    }

    let container = &spec.container;

    // Zero means "not configured", the same as leaving the field out.
    let memory = container.memory.filter(|m| *m > 0);
    let memory_reservation = container.memory_reservation.filter(|m| *m > 0);
    match (memory, memory_reservation) {
        (None, None) => {
            return Err(ValidationError::MissingMemory(container.name.to_string()));
        }
        (Some(memory), Some(reservation)) if memory < reservation => {
            return Err(ValidationError::MemoryBelowReservation {
                memory,
                reservation,
            });
        }
        _ => {}
    }

    let port_mappings = container
        .ports
        .iter()
        .map(normalize_port)
        .collect::<Result<Vec<_>, _>>()?;

    // BTreeMap iteration is key-ordered, which keeps payloads reproducible.
    let environment = container
        .environment
        .iter()
        .map(|(name, value)| EnvironmentVariable {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();

    let log_configuration = container
        .logs
        .as_ref()
        .map(log_configuration)
        .transpose()?;

    Ok(TaskDefinition {
        family: spec.task.family.to_string(),
        network_mode: spec.task.network_mode,
        task_role_arn: spec.task.role.clone(),
        container: ContainerDefinition {
            name: container.name.to_string(),
            image: image.to_string(),
            essential: true,
            cpu: container.cpu.filter(|c| *c > 0),
            memory,
            memory_reservation,
            port_mappings,
            environment,
            log_configuration,
        },
    })
}

/// Normalize one operator-written port into a mapping.
///
/// A bare number or numeric string becomes a TCP mapping on that container
/// port; the object form may add a host port and an explicit protocol.
pub fn normalize_port(port: &PortSpec) -> Result<PortMapping, ValidationError> {
    match port {
        PortSpec::Number(n) => Ok(PortMapping {
            container_port: port_number(*n, &n.to_string())?,
            host_port: None,
            protocol: Default::default(),
        }),
        PortSpec::Text(text) => {
            let n = text
                .trim()
                .parse::<u64>()
                .map_err(|_| ValidationError::InvalidPort(text.clone()))?;
            Ok(PortMapping {
                container_port: port_number(n, text)?,
                host_port: None,
                protocol: Default::default(),
            })
        }
        PortSpec::Mapping {
            container,
            host,
            protocol,
        } => {
            let container = container.ok_or(ValidationError::MissingContainerPort)?;
            let host_port = host
                .map(|h| port_number(h, &h.to_string()))
                .transpose()?;
            Ok(PortMapping {
                container_port: port_number(container, &container.to_string())?,
                host_port,
                protocol: protocol.unwrap_or_default(),
            })
        }
    }
}

fn port_number(n: u64, raw: &str) -> Result<u16, ValidationError> {
    u16::try_from(n)
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| ValidationError::InvalidPort(raw.to_string()))
}

fn log_configuration(logs: &LogSpec) -> Result<LogConfiguration, ValidationError> {
    if logs.is_awslogs() && logs.log_group().is_none() {
        return Err(ValidationError::MissingLogGroup);
    }

    Ok(LogConfiguration {
        log_driver: logs.driver.clone(),
        options: logs.options.clone(),
    })
}
