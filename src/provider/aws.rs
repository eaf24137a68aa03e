// ABOUTME: AWS SDK implementation of the regional control plane.
// ABOUTME: ECS for clusters, services and task definitions; ELBv2 for routing; CloudWatch Logs.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_cloudwatchlogs as logs;
use aws_sdk_ecs as ecs;
use aws_sdk_elasticloadbalancingv2 as elb;
use std::error::Error as StdError;
use std::time::Duration;

use super::traits::{
    ClusterOps, Connector, LoadBalancerOps, LogGroupOps, ServiceOps, TaskDefinitionOps,
};
use super::types::{
    ClusterDescription, CreateRuleRequest, CreateServiceRequest, CreateTargetGroupRequest,
    ListenerDescription, LoadBalancerDescription, RegisteredTaskDefinition, RuleCondition,
    RuleDescription, ServiceDescription, ServiceStatus, TargetGroupDescription,
};
use super::ProviderError;
use crate::task::{ContainerDefinition, TaskDefinition};
use crate::types::{
    ClusterArn, ListenerArn, LoadBalancerArn, Region, RuleArn, ServiceArn, TargetGroupArn,
    TaskDefinitionArn,
};

const DEREGISTRATION_DELAY_ATTRIBUTE: &str = "deregistration_delay.timeout_seconds";

// =============================================================================
// Error Mapping Helpers
// =============================================================================

pub(crate) fn request_error<E>(operation: &str, err: E) -> ProviderError
where
    E: StdError + 'static,
{
    ProviderError::request(format!(
        "{operation}: {}",
        ecs::error::DisplayErrorContext(err)
    ))
}

fn missing_field(operation: &str, field: &str) -> ProviderError {
    ProviderError::request(format!("{operation} response did not include {field}"))
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

// =============================================================================
// Connection
// =============================================================================

/// Connects region workers using the default AWS credential chain.
#[derive(Debug, Clone, Default)]
pub struct AwsConnector {
    profile: Option<String>,
}

impl AwsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a named profile from the shared AWS config files.
    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: Some(profile.into()),
        }
    }

    /// Shared SDK configuration for `region` with this connector's credentials.
    pub async fn sdk_config(&self, region: &str) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()));
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }
}

#[async_trait]
impl Connector for AwsConnector {
    type Client = AwsControlPlane;

    async fn connect(&self, region: &Region) -> Result<AwsControlPlane, ProviderError> {
        let config = self.sdk_config(region.as_str()).await;
        tracing::debug!(region = %region, "connected AWS clients");
        Ok(AwsControlPlane::new(&config))
    }
}

/// Region-scoped ECS, ELBv2 and CloudWatch Logs clients.
#[derive(Debug, Clone)]
pub struct AwsControlPlane {
    ecs: ecs::Client,
    elb: elb::Client,
    logs: logs::Client,
}

impl AwsControlPlane {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ecs: ecs::Client::new(config),
            elb: elb::Client::new(config),
            logs: logs::Client::new(config),
        }
    }
}

// =============================================================================
// Clusters
// =============================================================================

fn cluster_description(cluster: &ecs::types::Cluster) -> ClusterDescription {
    ClusterDescription {
        name: cluster.cluster_name().unwrap_or_default().to_string(),
        arn: cluster.cluster_arn().map(ClusterArn::new),
        status: cluster.status().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl ClusterOps for AwsControlPlane {
    async fn describe_cluster(
        &self,
        name: &str,
    ) -> Result<Option<ClusterDescription>, ProviderError> {
        let output = self
            .ecs
            .describe_clusters()
            .clusters(name)
            .send()
            .await
            .map_err(|e| request_error("DescribeClusters", e))?;

        // Unknown clusters come back as failures, not errors.
        Ok(output
            .clusters()
            .iter()
            .find(|c| c.cluster_name() == Some(name))
            .map(cluster_description))
    }

    async fn create_cluster(&self, name: &str) -> Result<ClusterDescription, ProviderError> {
        let output = self
            .ecs
            .create_cluster()
            .cluster_name(name)
            .send()
            .await
            .map_err(|e| request_error("CreateCluster", e))?;

        output
            .cluster()
            .map(cluster_description)
            .ok_or_else(|| missing_field("CreateCluster", "cluster"))
    }
}

// =============================================================================
// Task definitions
// =============================================================================

fn container_definition(
    container: &ContainerDefinition,
) -> Result<ecs::types::ContainerDefinition, ProviderError> {
    let mut builder = ecs::types::ContainerDefinition::builder()
        .name(&container.name)
        .image(&container.image)
        .essential(container.essential);

    if let Some(cpu) = container.cpu {
        builder = builder.cpu(to_i32(cpu));
    }
    if let Some(memory) = container.memory {
        builder = builder.memory(to_i32(memory));
    }
    if let Some(reservation) = container.memory_reservation {
        builder = builder.memory_reservation(to_i32(reservation));
    }

    for mapping in &container.port_mappings {
        let mut port = ecs::types::PortMapping::builder()
            .container_port(i32::from(mapping.container_port))
            .protocol(ecs::types::TransportProtocol::from(
                mapping.protocol.as_str(),
            ));
        if let Some(host_port) = mapping.host_port {
            port = port.host_port(i32::from(host_port));
        }
        builder = builder.port_mappings(port.build());
    }

    for variable in &container.environment {
        builder = builder.environment(
            ecs::types::KeyValuePair::builder()
                .name(&variable.name)
                .value(&variable.value)
                .build(),
        );
    }

    if let Some(logs) = &container.log_configuration {
        let mut log_builder = ecs::types::LogConfiguration::builder()
            .log_driver(ecs::types::LogDriver::from(logs.log_driver.as_str()));
        for (key, value) in &logs.options {
            log_builder = log_builder.options(key, value);
        }
        let log_configuration = log_builder
            .build()
            .map_err(|e| ProviderError::request(format!("invalid log configuration: {e}")))?;
        builder = builder.log_configuration(log_configuration);
    }

    Ok(builder.build())
}

#[async_trait]
impl TaskDefinitionOps for AwsControlPlane {
    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<RegisteredTaskDefinition, ProviderError> {
        let mut request = self
            .ecs
            .register_task_definition()
            .family(&definition.family)
            .network_mode(ecs::types::NetworkMode::from(
                definition.network_mode.as_str(),
            ))
            .container_definitions(container_definition(&definition.container)?);
        if let Some(role) = &definition.task_role_arn {
            request = request.task_role_arn(role);
        }

        let output = request
            .send()
            .await
            .map_err(|e| request_error("RegisterTaskDefinition", e))?;

        let arn = output
            .task_definition()
            .and_then(|registered| registered.task_definition_arn())
            .map(TaskDefinitionArn::new)
            .ok_or_else(|| missing_field("RegisterTaskDefinition", "taskDefinitionArn"))?;

        Ok(RegisteredTaskDefinition {
            revision: arn.revision().unwrap_or_default(),
            family: definition.family.clone(),
            arn,
        })
    }

    async fn deregister_task_definition(
        &self,
        arn: &TaskDefinitionArn,
    ) -> Result<(), ProviderError> {
        self.ecs
            .deregister_task_definition()
            .task_definition(arn.as_str())
            .send()
            .await
            .map_err(|e| request_error("DeregisterTaskDefinition", e))?;
        Ok(())
    }
}

// =============================================================================
// Services
// =============================================================================

fn service_description(service: &ecs::types::Service) -> ServiceDescription {
    ServiceDescription {
        name: service.service_name().unwrap_or_default().to_string(),
        arn: service.service_arn().map(ServiceArn::new),
        status: ServiceStatus::parse(service.status().unwrap_or_default()),
        desired_count: count(service.desired_count()),
        running_count: count(service.running_count()),
        pending_count: count(service.pending_count()),
        deployment_count: u32::try_from(service.deployments().len()).unwrap_or(u32::MAX),
        task_definition: service.task_definition().map(TaskDefinitionArn::new),
    }
}

#[async_trait]
impl ServiceOps for AwsControlPlane {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<Option<ServiceDescription>, ProviderError> {
        let result = self
            .ecs
            .describe_services()
            .cluster(cluster)
            .services(service)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_cluster_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(request_error("DescribeServices", e)),
        };

        Ok(output
            .services()
            .iter()
            .find(|s| s.service_name() == Some(service))
            .map(service_description))
    }

    async fn create_service(
        &self,
        request: &CreateServiceRequest,
    ) -> Result<ServiceDescription, ProviderError> {
        let deployment = ecs::types::DeploymentConfiguration::builder()
            .maximum_percent(to_i32(request.maximum_percent))
            .minimum_healthy_percent(to_i32(request.minimum_healthy_percent))
            .build();

        let mut call = self
            .ecs
            .create_service()
            .cluster(request.cluster.as_str())
            .service_name(request.service_name.as_str())
            .task_definition(request.task_definition.as_str())
            .desired_count(to_i32(request.desired_count))
            .deployment_configuration(deployment);

        if let Some(binding) = &request.load_balancer {
            call = call.load_balancers(
                ecs::types::LoadBalancer::builder()
                    .target_group_arn(binding.target_group.as_str())
                    .container_name(&binding.container_name)
                    .container_port(i32::from(binding.container_port))
                    .build(),
            );
            if let Some(role) = &request.role {
                call = call.role(role);
            }
        }

        let output = call
            .send()
            .await
            .map_err(|e| request_error("CreateService", e))?;

        output
            .service()
            .map(service_description)
            .ok_or_else(|| missing_field("CreateService", "service"))
    }

    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &TaskDefinitionArn,
    ) -> Result<ServiceDescription, ProviderError> {
        let output = self
            .ecs
            .update_service()
            .cluster(cluster)
            .service(service)
            .task_definition(task_definition.as_str())
            .send()
            .await
            .map_err(|e| request_error("UpdateService", e))?;

        output
            .service()
            .map(service_description)
            .ok_or_else(|| missing_field("UpdateService", "service"))
    }
}

// =============================================================================
// Load balancing
// =============================================================================

fn target_group_description(
    group: &elb::types::TargetGroup,
) -> Result<TargetGroupDescription, ProviderError> {
    let arn = group
        .target_group_arn()
        .ok_or_else(|| missing_field("DescribeTargetGroups", "TargetGroupArn"))?;
    Ok(TargetGroupDescription {
        name: group.target_group_name().unwrap_or_default().to_string(),
        arn: TargetGroupArn::new(arn),
    })
}

fn rule_description(rule: &elb::types::Rule) -> RuleDescription {
    let conditions = rule
        .conditions()
        .iter()
        .map(|condition| {
            // Newer rules carry their values in the typed config blocks.
            let mut values = condition.values().to_vec();
            if values.is_empty() {
                if let Some(config) = condition.path_pattern_config() {
                    values = config.values().to_vec();
                } else if let Some(config) = condition.host_header_config() {
                    values = config.values().to_vec();
                }
            }
            RuleCondition {
                field: condition.field().unwrap_or_default().to_string(),
                values,
            }
        })
        .collect();

    let mut target_groups = Vec::new();
    for action in rule.actions() {
        if let Some(arn) = action.target_group_arn() {
            target_groups.push(TargetGroupArn::new(arn));
        }
        if let Some(forward) = action.forward_config() {
            target_groups.extend(
                forward
                    .target_groups()
                    .iter()
                    .filter_map(|tuple| tuple.target_group_arn())
                    .map(TargetGroupArn::new),
            );
        }
    }

    RuleDescription {
        arn: RuleArn::new(rule.rule_arn().unwrap_or_default()),
        priority: rule.priority().unwrap_or_default().to_string(),
        conditions,
        target_groups,
    }
}

#[async_trait]
impl LoadBalancerOps for AwsControlPlane {
    async fn describe_load_balancer(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancerDescription>, ProviderError> {
        let result = self.elb.describe_load_balancers().names(name).send().await;

        let output = match result {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_load_balancer_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(request_error("DescribeLoadBalancers", e)),
        };

        let Some(balancer) = output.load_balancers().first() else {
            return Ok(None);
        };
        let arn = balancer
            .load_balancer_arn()
            .ok_or_else(|| missing_field("DescribeLoadBalancers", "LoadBalancerArn"))?;

        Ok(Some(LoadBalancerDescription {
            name: balancer.load_balancer_name().unwrap_or(name).to_string(),
            arn: LoadBalancerArn::new(arn),
            vpc_id: balancer.vpc_id().map(str::to_string),
        }))
    }

    async fn describe_target_groups(
        &self,
        load_balancer: &LoadBalancerArn,
    ) -> Result<Vec<TargetGroupDescription>, ProviderError> {
        let result = self
            .elb
            .describe_target_groups()
            .load_balancer_arn(load_balancer.as_str())
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_target_group_not_found_exception()) =>
            {
                return Ok(Vec::new());
            }
            Err(e) => return Err(request_error("DescribeTargetGroups", e)),
        };

        output
            .target_groups()
            .iter()
            .map(target_group_description)
            .collect()
    }

    async fn create_target_group(
        &self,
        request: &CreateTargetGroupRequest,
    ) -> Result<TargetGroupDescription, ProviderError> {
        let health = &request.health_check;
        let mut call = self
            .elb
            .create_target_group()
            .name(&request.name)
            .port(i32::from(request.port))
            .protocol(elb::types::ProtocolEnum::Http)
            .health_check_protocol(elb::types::ProtocolEnum::Http)
            .health_check_path(&health.path)
            .health_check_port(&health.port)
            .health_check_interval_seconds(seconds(health.interval))
            .health_check_timeout_seconds(seconds(health.timeout))
            .healthy_threshold_count(to_i32(health.healthy_threshold))
            .unhealthy_threshold_count(to_i32(health.unhealthy_threshold))
            .matcher(
                elb::types::Matcher::builder()
                    .http_code(&request.matcher)
                    .build(),
            );
        if let Some(vpc_id) = &request.vpc_id {
            call = call.vpc_id(vpc_id);
        }

        let output = call
            .send()
            .await
            .map_err(|e| request_error("CreateTargetGroup", e))?;

        output
            .target_groups()
            .first()
            .ok_or_else(|| missing_field("CreateTargetGroup", "TargetGroups"))
            .and_then(target_group_description)
    }

    async fn set_deregistration_delay(
        &self,
        target_group: &TargetGroupArn,
        delay: Duration,
    ) -> Result<(), ProviderError> {
        self.elb
            .modify_target_group_attributes()
            .target_group_arn(target_group.as_str())
            .attributes(
                elb::types::TargetGroupAttribute::builder()
                    .key(DEREGISTRATION_DELAY_ATTRIBUTE)
                    .value(delay.as_secs().to_string())
                    .build(),
            )
            .send()
            .await
            .map_err(|e| request_error("ModifyTargetGroupAttributes", e))?;
        Ok(())
    }

    async fn describe_listeners(
        &self,
        load_balancer: &LoadBalancerArn,
    ) -> Result<Vec<ListenerDescription>, ProviderError> {
        let output = self
            .elb
            .describe_listeners()
            .load_balancer_arn(load_balancer.as_str())
            .send()
            .await
            .map_err(|e| request_error("DescribeListeners", e))?;

        Ok(output
            .listeners()
            .iter()
            .filter_map(|listener| listener.listener_arn())
            .map(|arn| ListenerDescription {
                arn: ListenerArn::new(arn),
            })
            .collect())
    }

    async fn describe_rules(
        &self,
        listener: &ListenerArn,
    ) -> Result<Vec<RuleDescription>, ProviderError> {
        let mut rules = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .elb
                .describe_rules()
                .listener_arn(listener.as_str())
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| request_error("DescribeRules", e))?;

            rules.extend(output.rules().iter().map(rule_description));

            match output.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(rules)
    }

    async fn create_rule(
        &self,
        request: &CreateRuleRequest,
    ) -> Result<RuleDescription, ProviderError> {
        let action = elb::types::Action::builder()
            .r#type(elb::types::ActionTypeEnum::Forward)
            .target_group_arn(request.target_group.as_str())
            .build();

        let mut call = self
            .elb
            .create_rule()
            .listener_arn(request.listener.as_str())
            .priority(to_i32(request.priority))
            .actions(action);
        for condition in &request.conditions {
            call = call.conditions(
                elb::types::RuleCondition::builder()
                    .field(&condition.field)
                    .set_values(Some(condition.values.clone()))
                    .build(),
            );
        }

        let output = call
            .send()
            .await
            .map_err(|e| request_error("CreateRule", e))?;

        output
            .rules()
            .first()
            .map(rule_description)
            .ok_or_else(|| missing_field("CreateRule", "Rules"))
    }
}

// =============================================================================
// Log groups
// =============================================================================

#[async_trait]
impl LogGroupOps for AwsControlPlane {
    async fn log_group_exists(&self, name: &str) -> Result<bool, ProviderError> {
        let output = self
            .logs
            .describe_log_groups()
            .log_group_name_prefix(name)
            .send()
            .await
            .map_err(|e| request_error("DescribeLogGroups", e))?;

        Ok(output
            .log_groups()
            .iter()
            .any(|group| group.log_group_name() == Some(name)))
    }

    async fn create_log_group(
        &self,
        name: &str,
        retention_days: Option<u32>,
    ) -> Result<(), ProviderError> {
        let result = self
            .logs
            .create_log_group()
            .log_group_name(name)
            .send()
            .await;

        match result {
            Ok(_) => {}
            // Another region's worker may have won the race in a shared account.
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_already_exists_exception()) => {}
            Err(e) => return Err(request_error("CreateLogGroup", e)),
        }

        if let Some(days) = retention_days {
            self.logs
                .put_retention_policy()
                .log_group_name(name)
                .retention_in_days(to_i32(days))
                .send()
                .await
                .map_err(|e| request_error("PutRetentionPolicy", e))?;
        }

        Ok(())
    }
}
