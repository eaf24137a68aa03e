// ABOUTME: Test support utilities.
// ABOUTME: Provides the in-memory fake cloud and deployment spec fixtures.

use std::sync::Once;
use std::time::Duration;
use tideway::config::Config;
use tideway::spec::DeploymentSpec;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_cloud;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("tideway=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A web service behind the `edge` load balancer, logging to CloudWatch.
#[allow(dead_code)]
pub const WEB_SERVICE: &str = r#"
name: shop
version: 3.1.0
regions: [us-east-1, eu-west-1]
cluster: main
service:
  name: shop-web
  desired_count: 2
task:
  family: shop
container:
  name: web
  memory: 512
  ports: [8080]
  environment:
    RELEASE: ${VERSION}
  logs:
    driver: awslogs
    options:
      awslogs-group: /ecs/shop
    retention_days: 14
load_balancer:
  name: edge
  path: /shop/*
  target_group:
    name: shop-web
rollout:
  timeout: 2s
  poll_interval: 10ms
"#;

/// A worker with no load balancer and no logging.
#[allow(dead_code)]
pub const WORKER: &str = r#"
name: jobs
version: 1.0.0
regions: us-east-1
cluster: main
service:
  name: jobs-worker
  desired_count: 1
task:
  family: jobs
container:
  name: worker
  memory_reservation: 128
rollout:
  timeout: 2s
  poll_interval: 10ms
"#;

#[allow(dead_code)]
pub fn spec(yaml: &str) -> DeploymentSpec {
    Config::from_yaml(yaml).unwrap().to_spec().unwrap()
}

/// `spec` with a shorter rollout timeout, for tests that expect a timeout.
#[allow(dead_code)]
pub fn impatient(mut spec: DeploymentSpec) -> DeploymentSpec {
    spec.rollout.timeout = Duration::from_millis(60);
    spec.rollout.poll_interval = Duration::from_millis(10);
    spec
}

#[allow(dead_code)]
pub const IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/shop:3.1.0";
