// ABOUTME: Configuration types and parsing for tideway.yml.
// ABOUTME: Handles environment overlays, version tokens, CLI overrides and resolution into a spec.

mod deserialize;
mod env_value;
mod init;
mod overrides;
mod tokens;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use overrides::Overrides;
pub use tokens::replace_tokens;

use crate::error::{Error, Result};
use crate::spec::{
    ContainerSpec, DeploymentSpec, LoadBalancerSpec, LogSpec, PortSpec, RolloutSpec, ServiceSpec,
    TaskSpec,
};
use crate::types::{Region, ResourceName};
use deserialize::deserialize_regions;
use nonempty::NonEmpty;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "tideway.yml";
pub const CONFIG_FILENAME_ALT: &str = "tideway.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".tideway/config.yml";

/// Environment used when none is selected.
pub const DEFAULT_ENVIRONMENT: &str = "production";

const ENVIRONMENTS_KEY: &str = "environments";
const VERSION_KEY: &str = "version";

/// A configuration file before an environment is selected.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    document: Value,
    path: Option<PathBuf>,
}

impl ConfigFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(yaml)?;
        let document = match document {
            Value::Null => Value::Mapping(Default::default()),
            Value::Mapping(_) => document,
            _ => {
                return Err(Error::InvalidConfig(
                    "configuration must be a YAML mapping".to_string(),
                ));
            }
        };
        Ok(Self {
            document,
            path: None,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut file = Self::from_yaml(&content)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "using configuration file");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Where the file was loaded from, if it came from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of the environments the file defines.
    pub fn environments(&self) -> Vec<String> {
        self.document
            .get(ENVIRONMENTS_KEY)
            .and_then(Value::as_mapping)
            .map(|envs| {
                envs.keys()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Produce the typed configuration for `environment`.
    ///
    /// The environment section is deep-merged over the base document, then
    /// `overrides` are written, then version tokens are replaced.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownEnvironment` for an undefined environment other
    /// than the default, and `Error::Yaml` or `Error::InvalidConfig` when the
    /// merged document is not a valid configuration.
    pub fn resolve(&self, environment: &str, overrides: &Overrides) -> Result<Config> {
        let mut document = self.document.clone();

        let overlay = document
            .as_mapping_mut()
            .and_then(|root| root.remove(ENVIRONMENTS_KEY))
            .and_then(|envs| match envs {
                Value::Mapping(mut envs) => envs.remove(environment),
                _ => None,
            });

        match overlay {
            Some(overlay) => deep_merge(&mut document, overlay),
            None if environment == DEFAULT_ENVIRONMENT => {}
            None => return Err(Error::UnknownEnvironment(environment.to_string())),
        }

        overrides.apply(&mut document);

        let version = document
            .get(VERSION_KEY)
            .and_then(scalar_string);
        replace_tokens(&mut document, version.as_deref())?;

        Ok(serde_yaml::from_value(document)?)
    }
}

/// Merge `overlay` into `base`. Mappings merge key by key; anything else replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Versions like `1.2` or `3` are written unquoted and parse as numbers.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Typed configuration for one environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_optional_scalar")]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_scalar")]
    pub tag: Option<String>,

    #[serde(deserialize_with = "deserialize_regions")]
    pub regions: NonEmpty<Region>,

    pub cluster: ResourceName,

    pub service: ServiceSpec,

    pub task: TaskSpec,

    pub container: ContainerConfig,

    #[serde(default)]
    pub load_balancer: Option<LoadBalancerSpec>,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub docker: DockerConfig,

    #[serde(default)]
    pub rollout: RolloutSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    pub name: ResourceName,

    #[serde(default)]
    pub cpu: Option<u32>,

    /// Hard limit in MiB.
    #[serde(default)]
    pub memory: Option<u32>,

    /// Soft reservation in MiB.
    #[serde(default)]
    pub memory_reservation: Option<u32>,

    #[serde(default)]
    pub ports: Vec<PortSpec>,

    #[serde(default)]
    pub environment: BTreeMap<String, EnvValue>,

    #[serde(default)]
    pub logs: Option<LogSpec>,
}

/// Registry repository the image is pushed to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default, deserialize_with = "deserialize_optional_scalar")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    /// Directory handed to `docker build`.
    #[serde(default = "default_context")]
    pub context: PathBuf,

    #[serde(default)]
    pub build_args: Vec<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            build_args: Vec::new(),
        }
    }
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Parse a configuration using the default environment and no overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        ConfigFile::from_yaml(yaml)?.resolve(DEFAULT_ENVIRONMENT, &Overrides::default())
    }

    /// Tag for the published image: the explicit tag, else the version.
    pub fn image_tag(&self) -> Result<&str> {
        self.tag
            .as_deref()
            .or(self.version.as_deref())
            .ok_or_else(|| Error::InvalidConfig("either tag or version must be set".to_string()))
    }

    /// Resolve environment references and build the immutable deployment spec.
    pub fn to_spec(&self) -> Result<DeploymentSpec> {
        self.rollout.validate().map_err(Error::InvalidConfig)?;

        let container = &self.container;
        Ok(DeploymentSpec {
            name: self.name.clone(),
            tag: self.image_tag()?.to_string(),
            regions: self.regions.clone(),
            cluster: self.cluster.clone(),
            service: self.service.clone(),
            task: self.task.clone(),
            container: ContainerSpec {
                name: container.name.clone(),
                cpu: container.cpu,
                memory: container.memory,
                memory_reservation: container.memory_reservation,
                ports: container.ports.clone(),
                environment: resolve_env_map(&container.environment)?,
                logs: container.logs.clone(),
            },
            load_balancer: self.load_balancer.clone(),
            rollout: self.rollout,
        })
    }

    /// Look up a configured region by name.
    pub fn region(&self, name: &str) -> Result<&Region> {
        self.regions
            .iter()
            .find(|region| region.as_str() == name.trim())
            .ok_or_else(|| Error::UnknownRegion(name.to_string()))
    }
}

fn deserialize_optional_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string or number")),
    }
}
