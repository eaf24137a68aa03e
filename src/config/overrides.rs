// ABOUTME: Command-line and environment overrides applied on top of the configuration file.
// ABOUTME: Each override writes one key of the merged YAML document before it is typed.

use clap::Args;
use serde_yaml::{Mapping, Value};

/// Values that replace whatever the configuration file says.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Name of the package being deployed
    #[arg(long, env = "TIDEWAY_NAME")]
    pub name: Option<String>,

    /// Image tag to publish and deploy (defaults to the configured version)
    #[arg(long, env = "TIDEWAY_TAG")]
    pub tag: Option<String>,

    /// Regions to deploy to (comma separated)
    #[arg(long, env = "TIDEWAY_REGIONS", value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Cluster to run the service in
    #[arg(long, env = "TIDEWAY_CLUSTER")]
    pub cluster: Option<String>,

    #[arg(long, env = "TIDEWAY_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Number of tasks the service keeps running
    #[arg(long, env = "TIDEWAY_SERVICE_COUNT")]
    pub service_count: Option<u32>,

    #[arg(long, env = "TIDEWAY_SERVICE_MINIMUM_PERCENT")]
    pub service_minimum_percent: Option<u32>,

    #[arg(long, env = "TIDEWAY_SERVICE_MAXIMUM_PERCENT")]
    pub service_maximum_percent: Option<u32>,

    /// IAM role for services registered with a load balancer
    #[arg(long, env = "TIDEWAY_SERVICE_ROLE")]
    pub service_role: Option<String>,

    #[arg(long, env = "TIDEWAY_TASK_FAMILY")]
    pub task_family: Option<String>,

    /// bridge, host, awsvpc or none
    #[arg(long, env = "TIDEWAY_TASK_NETWORK_MODE")]
    pub task_network_mode: Option<String>,

    #[arg(long, env = "TIDEWAY_TASK_ROLE")]
    pub task_role: Option<String>,

    #[arg(long, env = "TIDEWAY_CONTAINER_NAME")]
    pub container_name: Option<String>,

    #[arg(long, env = "TIDEWAY_CONTAINER_CPU")]
    pub container_cpu: Option<u32>,

    /// Hard memory limit in MiB
    #[arg(long, env = "TIDEWAY_CONTAINER_MEMORY")]
    pub container_memory: Option<u32>,

    /// Soft memory reservation in MiB
    #[arg(long, env = "TIDEWAY_CONTAINER_MEMORY_RESERVATION")]
    pub container_memory_reservation: Option<u32>,

    /// Account that owns the image repository
    #[arg(long, env = "TIDEWAY_REPOSITORY_ACCOUNT_ID")]
    pub repository_account_id: Option<String>,

    #[arg(long, env = "TIDEWAY_REPOSITORY_REGION")]
    pub repository_region: Option<String>,

    #[arg(long, env = "TIDEWAY_REPOSITORY_NAME")]
    pub repository_name: Option<String>,

    /// Existing load balancer to route through
    #[arg(long, env = "TIDEWAY_LOAD_BALANCER_NAME")]
    pub load_balancer_name: Option<String>,

    #[arg(long, env = "TIDEWAY_LOAD_BALANCER_PATH")]
    pub load_balancer_path: Option<String>,

    #[arg(long, env = "TIDEWAY_LOAD_BALANCER_HOST")]
    pub load_balancer_host: Option<String>,

    #[arg(long, env = "TIDEWAY_TARGET_GROUP_NAME")]
    pub target_group_name: Option<String>,

    /// Build argument passed to docker build (repeatable)
    #[arg(long = "docker-build-arg", env = "TIDEWAY_DOCKER_BUILD_ARG")]
    pub docker_build_args: Vec<String>,
}

impl Overrides {
    /// Write every set override into `document`.
    pub fn apply(&self, document: &mut Value) {
        set_string(document, &["name"], &self.name);
        set_string(document, &["tag"], &self.tag);
        set_string(document, &["cluster"], &self.cluster);

        set_string(document, &["service", "name"], &self.service_name);
        set_number(document, &["service", "desired_count"], self.service_count);
        set_number(
            document,
            &["service", "minimum_healthy_percent"],
            self.service_minimum_percent,
        );
        set_number(
            document,
            &["service", "maximum_percent"],
            self.service_maximum_percent,
        );
        set_string(document, &["service", "role"], &self.service_role);

        set_string(document, &["task", "family"], &self.task_family);
        set_string(document, &["task", "network_mode"], &self.task_network_mode);
        set_string(document, &["task", "role"], &self.task_role);

        set_string(document, &["container", "name"], &self.container_name);
        set_number(document, &["container", "cpu"], self.container_cpu);
        set_number(document, &["container", "memory"], self.container_memory);
        set_number(
            document,
            &["container", "memory_reservation"],
            self.container_memory_reservation,
        );

        set_string(
            document,
            &["repository", "account_id"],
            &self.repository_account_id,
        );
        set_string(document, &["repository", "region"], &self.repository_region);
        set_string(document, &["repository", "name"], &self.repository_name);

        set_string(document, &["load_balancer", "name"], &self.load_balancer_name);
        set_string(document, &["load_balancer", "path"], &self.load_balancer_path);
        set_string(document, &["load_balancer", "host"], &self.load_balancer_host);
        set_string(
            document,
            &["load_balancer", "target_group", "name"],
            &self.target_group_name,
        );

        if !self.regions.is_empty() {
            set_path(document, &["regions"], Value::from(self.regions.clone()));
        }
        if !self.docker_build_args.is_empty() {
            set_path(
                document,
                &["docker", "build_args"],
                Value::from(self.docker_build_args.clone()),
            );
        }
    }
}

fn set_string(document: &mut Value, path: &[&str], value: &Option<String>) {
    if let Some(value) = value {
        set_path(document, path, Value::from(value.as_str()));
    }
}

fn set_number(document: &mut Value, path: &[&str], value: Option<u32>) {
    if let Some(value) = value {
        set_path(document, path, Value::from(u64::from(value)));
    }
}

/// Set `path` in `document`, creating intermediate mappings as needed.
fn set_path(document: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = document;
    for key in parents {
        if !current.is_mapping() {
            *current = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = current else {
            return;
        };
        current = map
            .entry(Value::from(*key))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    if !current.is_mapping() {
        *current = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = current {
        map.insert(Value::from(*last), value);
    }
}
