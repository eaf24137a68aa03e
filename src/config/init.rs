// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented tideway.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ResourceName;

use super::CONFIG_FILENAME;

/// Write a starter `tideway.yml` into `dir` and return its path.
pub fn init_config(dir: &Path, name: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let name = name.unwrap_or("my-app");
    ResourceName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, generate_template_yaml(name))?;
    Ok(config_path)
}

fn generate_template_yaml(name: &str) -> String {
    format!(
        r#"name: {name}
version: 0.1.0
# tag: ${{VERSION}}

regions:
  - us-east-1

cluster: {name}

service:
  name: {name}
  desired_count: 2
  minimum_healthy_percent: 50
  maximum_percent: 200

task:
  family: {name}
  network_mode: bridge

container:
  name: {name}
  memory_reservation: 256
  ports:
    - 8080
  environment:
    RELEASE: ${{VERSION}}
    # DATABASE_URL:
    #   env: DATABASE_URL
  # logs:
  #   driver: awslogs
  #   options:
  #     awslogs-group: /ecs/{name}
  #   retention_days: 30

# load_balancer:
#   name: my-load-balancer
#   path: /{name}/*
#   target_group:
#     name: {name}
#     health_check:
#       path: /health

repository:
  account_id: "123456789012"
  region: us-east-1
  name: {name}

# environments:
#   staging:
#     cluster: staging
#     service:
#       desired_count: 1
"#
    )
}
