// ABOUTME: Task definition builder: deployment spec plus image into a registration payload.
// ABOUTME: Pure and deterministic; region-specific variants are derived at registration time.

mod builder;
mod definition;

pub use builder::{build, normalize_port};
pub use definition::{ContainerDefinition, EnvironmentVariable, LogConfiguration, PortMapping, TaskDefinition};
