// ABOUTME: Integration tests for the service reconciler and the rollout barrier.
// ABOUTME: Create vs update decisions, routing bindings, and waiting for stability.

mod support;

use std::time::Duration;
use support::fake_cloud::{FakeCloud, target_group_arn};
use support::{WORKER, spec};
use tideway::deploy::{DeployError, DeployEvent, Progress, reconcile_service, wait_for_stable};
use tideway::provider::{ProviderError, ServiceLoadBalancer};
use tideway::spec::{DeploymentSpec, RolloutSpec};
use tideway::types::{Region, TaskDefinitionArn};

const REGION: &str = "us-east-1";

fn region() -> Region {
    Region::new(REGION).unwrap()
}

fn revision(n: u32) -> TaskDefinitionArn {
    TaskDefinitionArn::new(format!(
        "arn:aws:ecs:{REGION}:123456789012:task-definition/jobs:{n}"
    ))
}

fn worker() -> DeploymentSpec {
    spec(WORKER)
}

mod reconcile {
    use super::*;

    #[tokio::test]
    async fn active_service_is_updated_in_place() {
        let cloud = FakeCloud::new();
        cloud.with_service(REGION, "main", "jobs-worker", "jobs", 4);

        let change = reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(5), None)
            .await
            .unwrap();

        assert!(!change.was_created());
        assert_eq!(change.previous_task_definition(), Some(&revision(4)));
        assert_eq!(change.service().task_definition, Some(revision(5)));
        assert_eq!(cloud.count(REGION, "CreateService"), 0);
    }

    #[tokio::test]
    async fn missing_service_is_created_with_configured_counts() {
        let cloud = FakeCloud::new();

        let change = reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(1), None)
            .await
            .unwrap();

        assert!(change.was_created());
        assert_eq!(change.previous_task_definition(), None);

        let request = cloud
            .region(REGION, |r| r.service("main", "jobs-worker").cloned())
            .and_then(|service| service.request)
            .unwrap();
        assert_eq!(request.desired_count, 1);
        assert_eq!(request.minimum_healthy_percent, 50);
        assert_eq!(request.maximum_percent, 200);
        assert_eq!(request.load_balancer, None);
        assert_eq!(request.role, None, "role is only sent with a load balancer");
    }

    #[tokio::test]
    async fn inactive_service_is_recreated() {
        let cloud = FakeCloud::new();
        cloud.with_service(REGION, "main", "jobs-worker", "jobs", 2);
        cloud.set_service_status(REGION, "main", "jobs-worker", "INACTIVE");

        let change = reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(3), None)
            .await
            .unwrap();

        assert!(change.was_created());
        assert_eq!(cloud.count(REGION, "UpdateService"), 0);
    }

    #[tokio::test]
    async fn created_service_carries_binding_and_role() {
        let cloud = FakeCloud::new();
        let binding = ServiceLoadBalancer {
            target_group: target_group_arn(REGION, "jobs"),
            container_name: "worker".to_string(),
            container_port: 8080,
        };

        reconcile_service(
            &cloud.client(REGION),
            &region(),
            &worker(),
            &revision(1),
            Some(binding.clone()),
        )
        .await
        .unwrap();

        let request = cloud
            .region(REGION, |r| r.service("main", "jobs-worker").cloned())
            .and_then(|service| service.request)
            .unwrap();
        assert_eq!(request.load_balancer, Some(binding));
        assert_eq!(request.role.as_deref(), Some("ecsServiceRole"));
    }

    #[tokio::test]
    async fn update_failure_is_reported() {
        let cloud = FakeCloud::new();
        cloud
            .with_service(REGION, "main", "jobs-worker", "jobs", 4)
            .fail(REGION, "UpdateService", "ServiceNotActive");

        let err = reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(5), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Infrastructure { operation: "UpdateService", .. }
        ));
    }
}

mod barrier {
    use super::*;

    fn rollout(timeout_ms: u64) -> RolloutSpec {
        RolloutSpec {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(10),
        }
    }

    async fn wait(cloud: &FakeCloud, rollout: RolloutSpec, progress: &Progress) -> Result<u32, DeployError> {
        let spec = worker();
        wait_for_stable(
            &cloud.client(REGION),
            &region(),
            &spec.cluster,
            &spec.service.name,
            &rollout,
            progress,
        )
        .await
        .map(|service| service.running_count)
    }

    #[tokio::test]
    async fn returns_once_the_rollout_settles() {
        let cloud = FakeCloud::new();
        cloud.rollout_polls(2).with_service(REGION, "main", "jobs-worker", "jobs", 1);
        reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(2), None)
            .await
            .unwrap();
        let (progress, mut events) = Progress::channel();

        let running = wait(&cloud, rollout(2_000), &progress).await.unwrap();
        drop(progress);

        assert_eq!(running, 2);
        let mut polls = 0;
        while let Some(event) = events.recv().await {
            assert!(matches!(event, DeployEvent::RolloutPoll { .. }));
            polls += 1;
        }
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn gives_up_at_the_deadline() {
        let cloud = FakeCloud::new();
        cloud
            .with_service(REGION, "main", "jobs-worker", "jobs", 1)
            .stuck(REGION);
        reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(2), None)
            .await
            .unwrap();

        let err = wait(&cloud, rollout(50), &Progress::disabled()).await.unwrap_err();

        assert!(matches!(err, DeployError::Timeout { .. }));
        assert!(cloud.count(REGION, "DescribeServices") > 1);
    }

    #[tokio::test]
    async fn unbounded_timeout_still_settles() {
        let cloud = FakeCloud::new();
        cloud.with_service(REGION, "main", "jobs-worker", "jobs", 1);
        reconcile_service(&cloud.client(REGION), &region(), &worker(), &revision(2), None)
            .await
            .unwrap();
        let rollout = RolloutSpec {
            timeout: Duration::MAX,
            poll_interval: Duration::from_millis(10),
        };

        let running = wait(&cloud, rollout, &Progress::disabled()).await.unwrap();

        assert_eq!(running, 2);
    }

    #[tokio::test]
    async fn vanished_service_is_an_infrastructure_error() {
        let cloud = FakeCloud::new();

        let err = wait(&cloud, rollout(1_000), &Progress::disabled()).await.unwrap_err();

        match err {
            DeployError::Infrastructure { source, .. } => {
                assert!(matches!(source, ProviderError::NotFound(_)));
            }
            other => panic!("expected infrastructure error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn draining_service_is_an_infrastructure_error() {
        let cloud = FakeCloud::new();
        cloud.with_service(REGION, "main", "jobs-worker", "jobs", 1);
        cloud.set_service_status(REGION, "main", "jobs-worker", "DRAINING");

        let err = wait(&cloud, rollout(1_000), &Progress::disabled()).await.unwrap_err();

        assert!(err.to_string().contains("DescribeServices"));
        assert!(matches!(err, DeployError::Infrastructure { .. }));
    }
}
