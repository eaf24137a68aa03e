// ABOUTME: In-memory control plane that behaves like ECS, ELBv2 and CloudWatch Logs.
// ABOUTME: Per-region state, a shared call log, injectable failures and controllable rollouts.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tideway::provider::{
    ClusterDescription, ClusterOps, Connector, CreateRuleRequest, CreateServiceRequest,
    CreateTargetGroupRequest, ListenerDescription, LoadBalancerDescription, LoadBalancerOps,
    LogGroupOps, ProviderError, RegisteredTaskDefinition, RuleCondition, RuleDescription,
    ServiceDescription, ServiceOps, ServiceStatus, TargetGroupDescription, TaskDefinitionOps,
};
use tideway::task::TaskDefinition;
use tideway::types::{
    ClusterArn, ListenerArn, LoadBalancerArn, Region, RuleArn, ServiceArn, TargetGroupArn,
    TaskDefinitionArn,
};

const ACCOUNT: &str = "123456789012";

/// One provider call, as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub region: String,
    pub operation: &'static str,
}

/// A task definition revision held by the fake registry.
#[derive(Debug, Clone)]
pub struct Revision {
    pub arn: TaskDefinitionArn,
    pub definition: TaskDefinition,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub description: ServiceDescription,
    pub request: Option<CreateServiceRequest>,
    /// Describe calls left before the rollout settles.
    pub unstable_polls: u32,
}

#[derive(Debug, Clone)]
pub struct TargetGroup {
    pub description: TargetGroupDescription,
    pub request: CreateTargetGroupRequest,
    pub deregistration_delay: Option<Duration>,
}

/// Everything the fake knows about one region.
#[derive(Debug, Default)]
pub struct RegionState {
    pub clusters: BTreeMap<String, ClusterDescription>,
    pub revisions: Vec<Revision>,
    pub services: BTreeMap<(String, String), Service>,
    pub load_balancers: Vec<LoadBalancerDescription>,
    pub target_groups: Vec<TargetGroup>,
    pub listeners: Vec<(LoadBalancerArn, ListenerArn)>,
    pub rules: Vec<(ListenerArn, RuleDescription)>,
    pub log_groups: BTreeMap<String, Option<u32>>,
    /// Rollouts in this region never settle.
    pub stuck: bool,
}

impl RegionState {
    pub fn service(&self, cluster: &str, name: &str) -> Option<&Service> {
        self.services.get(&(cluster.to_string(), name.to_string()))
    }

    pub fn active_revisions(&self) -> Vec<String> {
        self.revisions
            .iter()
            .filter(|r| r.active)
            .map(|r| r.arn.resource().to_string())
            .collect()
    }

    pub fn rules_on(&self, listener: &ListenerArn) -> Vec<&RuleDescription> {
        self.rules
            .iter()
            .filter(|(l, _)| l == listener)
            .map(|(_, rule)| rule)
            .collect()
    }
}

#[derive(Debug, Default)]
struct State {
    regions: HashMap<String, RegionState>,
    calls: Vec<Call>,
    failures: HashMap<(String, &'static str), ProviderError>,
    unreachable: HashSet<String>,
    rollout_polls: u32,
    reuse_identical_revisions: bool,
    next_id: u64,
}

impl State {
    fn region(&mut self, region: &str) -> &mut RegionState {
        self.regions.entry(region.to_string()).or_default()
    }

    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared fake cloud. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<State>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        let cloud = Self::default();
        cloud.state.lock().rollout_polls = 1;
        cloud
    }

    /// Number of describe calls after an update before the service settles.
    pub fn rollout_polls(&self, polls: u32) -> &Self {
        self.state.lock().rollout_polls = polls;
        self
    }

    /// Registering a definition identical to an active revision returns that revision.
    pub fn reuse_identical_revisions(&self) -> &Self {
        self.state.lock().reuse_identical_revisions = true;
        self
    }

    /// Make every `operation` call in `region` fail.
    pub fn fail(&self, region: &str, operation: &'static str, message: &str) -> &Self {
        self.state.lock().failures.insert(
            (region.to_string(), operation),
            ProviderError::request(message),
        );
        self
    }

    pub fn unreachable(&self, region: &str) -> &Self {
        self.state.lock().unreachable.insert(region.to_string());
        self
    }

    /// Rollouts in `region` never become stable.
    pub fn stuck(&self, region: &str) -> &Self {
        self.state.lock().region(region).stuck = true;
        self
    }

    pub fn with_cluster(&self, region: &str, name: &str, status: &str) -> &Self {
        self.state.lock().region(region).clusters.insert(
            name.to_string(),
            ClusterDescription {
                name: name.to_string(),
                arn: Some(ClusterArn::new(format!(
                    "arn:aws:ecs:{region}:{ACCOUNT}:cluster/{name}"
                ))),
                status: status.to_string(),
            },
        );
        self
    }

    /// Seed a load balancer with one listener per entry in `listeners`.
    pub fn with_load_balancer(&self, region: &str, name: &str, listeners: &[&str]) -> &Self {
        let mut state = self.state.lock();
        let arn = LoadBalancerArn::new(format!(
            "arn:aws:elasticloadbalancing:{region}:{ACCOUNT}:loadbalancer/app/{name}/1"
        ));
        let regional = state.region(region);
        regional.load_balancers.push(LoadBalancerDescription {
            name: name.to_string(),
            arn: arn.clone(),
            vpc_id: Some("vpc-1".to_string()),
        });
        for listener in listeners {
            regional.listeners.push((arn.clone(), listener_arn(region, name, listener)));
        }
        self
    }

    /// Seed a rule on a listener created by `with_load_balancer`.
    pub fn with_rule(
        &self,
        region: &str,
        load_balancer: &str,
        listener: &str,
        priority: &str,
        conditions: Vec<RuleCondition>,
        target_group: Option<&str>,
    ) -> &Self {
        let mut state = self.state.lock();
        let id = state.id();
        let listener = listener_arn(region, load_balancer, listener);
        let rule = RuleDescription {
            arn: RuleArn::new(format!("{listener}/rule/{id}")),
            priority: priority.to_string(),
            conditions,
            target_groups: target_group
                .map(|name| vec![target_group_arn(region, name)])
                .unwrap_or_default(),
        };
        state.region(region).rules.push((listener, rule));
        self
    }

    /// Seed a target group that already exists in the account.
    pub fn with_target_group(&self, region: &str, name: &str) -> &Self {
        self.state.lock().region(region).target_groups.push(TargetGroup {
            description: TargetGroupDescription {
                name: name.to_string(),
                arn: target_group_arn(region, name),
            },
            request: CreateTargetGroupRequest {
                name: name.to_string(),
                vpc_id: Some("vpc-1".to_string()),
                port: 80,
                health_check: Default::default(),
                matcher: "200-299".to_string(),
            },
            deregistration_delay: None,
        });
        self
    }

    /// Seed a service already running `family:revision`.
    pub fn with_service(
        &self,
        region: &str,
        cluster: &str,
        name: &str,
        family: &str,
        revision: u32,
    ) -> &Self {
        let mut state = self.state.lock();
        let regional = state.region(region);
        let arn = TaskDefinitionArn::new(format!(
            "arn:aws:ecs:{region}:{ACCOUNT}:task-definition/{family}:{revision}"
        ));
        regional.services.insert(
            (cluster.to_string(), name.to_string()),
            Service {
                description: ServiceDescription {
                    name: name.to_string(),
                    arn: Some(ServiceArn::new(format!(
                        "arn:aws:ecs:{region}:{ACCOUNT}:service/{cluster}/{name}"
                    ))),
                    status: ServiceStatus::Active,
                    desired_count: 2,
                    running_count: 2,
                    pending_count: 0,
                    deployment_count: 1,
                    task_definition: Some(arn.clone()),
                },
                request: None,
                unstable_polls: 0,
            },
        );
        regional.revisions.push(Revision {
            arn,
            definition: placeholder_definition(family),
            active: true,
        });
        self
    }

    /// Change the status of a seeded or created service.
    pub fn set_service_status(&self, region: &str, cluster: &str, name: &str, status: &str) {
        let mut state = self.state.lock();
        if let Some(service) = state
            .region(region)
            .services
            .get_mut(&(cluster.to_string(), name.to_string()))
        {
            service.description.status = ServiceStatus::parse(status);
        }
    }

    pub fn remove_service(&self, region: &str, cluster: &str, name: &str) {
        self.state
            .lock()
            .region(region)
            .services
            .remove(&(cluster.to_string(), name.to_string()));
    }

    pub fn with_log_group(&self, region: &str, name: &str) -> &Self {
        self.state
            .lock()
            .region(region)
            .log_groups
            .insert(name.to_string(), None);
        self
    }

    /// Inspect one region's state.
    pub fn region<R>(&self, region: &str, f: impl FnOnce(&RegionState) -> R) -> R {
        let mut state = self.state.lock();
        f(state.region(region))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Operations called in `region`, in order.
    pub fn operations(&self, region: &str) -> Vec<&'static str> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.region == region)
            .map(|call| call.operation)
            .collect()
    }

    pub fn count(&self, region: &str, operation: &str) -> usize {
        self.operations(region)
            .into_iter()
            .filter(|op| *op == operation)
            .count()
    }

    pub fn client(&self, region: &str) -> FakeControlPlane {
        FakeControlPlane {
            region: region.to_string(),
            cloud: self.clone(),
        }
    }
}

#[async_trait]
impl Connector for FakeCloud {
    type Client = FakeControlPlane;

    async fn connect(&self, region: &Region) -> Result<FakeControlPlane, ProviderError> {
        if self.state.lock().unreachable.contains(region.as_str()) {
            return Err(ProviderError::request(format!(
                "could not resolve endpoint for {region}"
            )));
        }
        Ok(self.client(region.as_str()))
    }
}

/// Client bound to one region of a `FakeCloud`.
#[derive(Debug, Clone)]
pub struct FakeControlPlane {
    region: String,
    cloud: FakeCloud,
}

impl FakeControlPlane {
    /// Record the call, fail it if a failure was injected, else run `f` on the region.
    fn call<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut State, &str) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut state = self.cloud.state.lock();
        state.calls.push(Call {
            region: self.region.clone(),
            operation,
        });
        if let Some(error) = state.failures.get(&(self.region.clone(), operation)) {
            return Err(error.clone());
        }
        f(&mut *state, &self.region)
    }
}

#[async_trait]
impl ClusterOps for FakeControlPlane {
    async fn describe_cluster(
        &self,
        name: &str,
    ) -> Result<Option<ClusterDescription>, ProviderError> {
        self.call("DescribeClusters", |state, region| {
            Ok(state.region(region).clusters.get(name).cloned())
        })
    }

    async fn create_cluster(&self, name: &str) -> Result<ClusterDescription, ProviderError> {
        self.call("CreateCluster", |state, region| {
            let cluster = ClusterDescription {
                name: name.to_string(),
                arn: Some(ClusterArn::new(format!(
                    "arn:aws:ecs:{region}:{ACCOUNT}:cluster/{name}"
                ))),
                status: "ACTIVE".to_string(),
            };
            state
                .region(region)
                .clusters
                .insert(name.to_string(), cluster.clone());
            Ok(cluster)
        })
    }
}

#[async_trait]
impl TaskDefinitionOps for FakeControlPlane {
    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<RegisteredTaskDefinition, ProviderError> {
        self.call("RegisterTaskDefinition", |state, region| {
            let reuse = state.reuse_identical_revisions;
            let regional = state.region(region);
            let identical = regional
                .revisions
                .iter()
                .rev()
                .find(|r| reuse && r.active && &r.definition == definition)
                .map(|r| r.arn.clone());
            if let Some(arn) = identical {
                return Ok(RegisteredTaskDefinition {
                    revision: arn.revision().unwrap_or_default(),
                    family: definition.family.clone(),
                    arn,
                });
            }
            let revision = regional
                .revisions
                .iter()
                .filter(|r| r.definition.family == definition.family)
                .filter_map(|r| r.arn.revision())
                .max()
                .unwrap_or(0)
                + 1;
            let arn = TaskDefinitionArn::new(format!(
                "arn:aws:ecs:{region}:{ACCOUNT}:task-definition/{}:{revision}",
                definition.family
            ));
            regional.revisions.push(Revision {
                arn: arn.clone(),
                definition: definition.clone(),
                active: true,
            });
            Ok(RegisteredTaskDefinition {
                arn,
                family: definition.family.clone(),
                revision,
            })
        })
    }

    async fn deregister_task_definition(
        &self,
        arn: &TaskDefinitionArn,
    ) -> Result<(), ProviderError> {
        self.call("DeregisterTaskDefinition", |state, region| {
            match state
                .region(region)
                .revisions
                .iter_mut()
                .find(|r| &r.arn == arn)
            {
                Some(revision) => {
                    revision.active = false;
                    Ok(())
                }
                None => Err(ProviderError::request(format!(
                    "unable to describe task definition {arn}"
                ))),
            }
        })
    }
}

#[async_trait]
impl ServiceOps for FakeControlPlane {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<Option<ServiceDescription>, ProviderError> {
        self.call("DescribeServices", |state, region| {
            let regional = state.region(region);
            let stuck = regional.stuck;
            let Some(current) = regional
                .services
                .get_mut(&(cluster.to_string(), service.to_string()))
            else {
                return Ok(None);
            };

            if current.unstable_polls > 0 && !stuck {
                current.unstable_polls -= 1;
            } else if current.unstable_polls == 0 && !stuck {
                let description = &mut current.description;
                description.running_count = description.desired_count;
                description.pending_count = 0;
                description.deployment_count = 1;
            }
            Ok(Some(current.description.clone()))
        })
    }

    async fn create_service(
        &self,
        request: &CreateServiceRequest,
    ) -> Result<ServiceDescription, ProviderError> {
        self.call("CreateService", |state, region| {
            let polls = state.rollout_polls;
            let description = ServiceDescription {
                name: request.service_name.to_string(),
                arn: Some(ServiceArn::new(format!(
                    "arn:aws:ecs:{region}:{ACCOUNT}:service/{}/{}",
                    request.cluster, request.service_name
                ))),
                status: ServiceStatus::Active,
                desired_count: request.desired_count,
                running_count: 0,
                pending_count: request.desired_count,
                deployment_count: 1,
                task_definition: Some(request.task_definition.clone()),
            };
            state.region(region).services.insert(
                (request.cluster.to_string(), request.service_name.to_string()),
                Service {
                    description: description.clone(),
                    request: Some(request.clone()),
                    unstable_polls: polls,
                },
            );
            Ok(description)
        })
    }

    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &TaskDefinitionArn,
    ) -> Result<ServiceDescription, ProviderError> {
        self.call("UpdateService", |state, region| {
            let polls = state.rollout_polls;
            let current = state
                .region(region)
                .services
                .get_mut(&(cluster.to_string(), service.to_string()))
                .ok_or_else(|| ProviderError::request(format!("service {service} not found")))?;
            current.description.task_definition = Some(task_definition.clone());
            current.description.deployment_count = 2;
            current.unstable_polls = polls;
            Ok(current.description.clone())
        })
    }
}

#[async_trait]
impl LoadBalancerOps for FakeControlPlane {
    async fn describe_load_balancer(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancerDescription>, ProviderError> {
        self.call("DescribeLoadBalancers", |state, region| {
            Ok(state
                .region(region)
                .load_balancers
                .iter()
                .find(|lb| lb.name == name)
                .cloned())
        })
    }

    /// Only groups some rule on the balancer forwards to, like the real API.
    async fn describe_target_groups(
        &self,
        load_balancer: &LoadBalancerArn,
    ) -> Result<Vec<TargetGroupDescription>, ProviderError> {
        self.call("DescribeTargetGroups", |state, region| {
            let regional = state.region(region);
            let listeners: Vec<&ListenerArn> = regional
                .listeners
                .iter()
                .filter(|(lb, _)| lb == load_balancer)
                .map(|(_, listener)| listener)
                .collect();
            let attached: Vec<TargetGroupDescription> = regional
                .target_groups
                .iter()
                .filter(|group| {
                    regional.rules.iter().any(|(listener, rule)| {
                        listeners.contains(&listener)
                            && rule.target_groups.contains(&group.description.arn)
                    })
                })
                .map(|group| group.description.clone())
                .collect();
            Ok(attached)
        })
    }

    async fn create_target_group(
        &self,
        request: &CreateTargetGroupRequest,
    ) -> Result<TargetGroupDescription, ProviderError> {
        self.call("CreateTargetGroup", |state, region| {
            let regional = state.region(region);
            if let Some(existing) = regional
                .target_groups
                .iter()
                .find(|group| group.description.name == request.name)
            {
                return Ok(existing.description.clone());
            }
            let description = TargetGroupDescription {
                name: request.name.clone(),
                arn: target_group_arn(region, &request.name),
            };
            regional.target_groups.push(TargetGroup {
                description: description.clone(),
                request: request.clone(),
                deregistration_delay: None,
            });
            Ok(description)
        })
    }

    async fn set_deregistration_delay(
        &self,
        target_group: &TargetGroupArn,
        delay: Duration,
    ) -> Result<(), ProviderError> {
        self.call("ModifyTargetGroupAttributes", |state, region| {
            let group = state
                .region(region)
                .target_groups
                .iter_mut()
                .find(|group| &group.description.arn == target_group)
                .ok_or_else(|| ProviderError::not_found(target_group.to_string()))?;
            group.deregistration_delay = Some(delay);
            Ok(())
        })
    }

    async fn describe_listeners(
        &self,
        load_balancer: &LoadBalancerArn,
    ) -> Result<Vec<ListenerDescription>, ProviderError> {
        self.call("DescribeListeners", |state, region| {
            Ok(state
                .region(region)
                .listeners
                .iter()
                .filter(|(lb, _)| lb == load_balancer)
                .map(|(_, arn)| ListenerDescription { arn: arn.clone() })
                .collect())
        })
    }

    async fn describe_rules(
        &self,
        listener: &ListenerArn,
    ) -> Result<Vec<RuleDescription>, ProviderError> {
        self.call("DescribeRules", |state, region| {
            let mut rules: Vec<RuleDescription> = state
                .region(region)
                .rules_on(listener)
                .into_iter()
                .cloned()
                .collect();
            // Every listener carries a default rule.
            rules.push(RuleDescription {
                arn: RuleArn::new(format!("{listener}/rule/default")),
                priority: "default".to_string(),
                conditions: Vec::new(),
                target_groups: Vec::new(),
            });
            Ok(rules)
        })
    }

    async fn create_rule(
        &self,
        request: &CreateRuleRequest,
    ) -> Result<RuleDescription, ProviderError> {
        self.call("CreateRule", |state, region| {
            let id = state.id();
            let regional = state.region(region);
            if regional
                .rules_on(&request.listener)
                .iter()
                .any(|rule| rule.priority == request.priority.to_string())
            {
                return Err(ProviderError::request(format!(
                    "priority {} is already in use",
                    request.priority
                )));
            }
            let rule = RuleDescription {
                arn: RuleArn::new(format!("{}/rule/{id}", request.listener)),
                priority: request.priority.to_string(),
                conditions: request.conditions.clone(),
                target_groups: vec![request.target_group.clone()],
            };
            regional.rules.push((request.listener.clone(), rule.clone()));
            Ok(rule)
        })
    }
}

#[async_trait]
impl LogGroupOps for FakeControlPlane {
    async fn log_group_exists(&self, name: &str) -> Result<bool, ProviderError> {
        self.call("DescribeLogGroups", |state, region| {
            Ok(state.region(region).log_groups.contains_key(name))
        })
    }

    async fn create_log_group(
        &self,
        name: &str,
        retention_days: Option<u32>,
    ) -> Result<(), ProviderError> {
        self.call("CreateLogGroup", |state, region| {
            state
                .region(region)
                .log_groups
                .insert(name.to_string(), retention_days);
            Ok(())
        })
    }
}

pub fn listener_arn(region: &str, load_balancer: &str, listener: &str) -> ListenerArn {
    ListenerArn::new(format!(
        "arn:aws:elasticloadbalancing:{region}:{ACCOUNT}:listener/app/{load_balancer}/1/{listener}"
    ))
}

pub fn target_group_arn(region: &str, name: &str) -> TargetGroupArn {
    TargetGroupArn::new(format!(
        "arn:aws:elasticloadbalancing:{region}:{ACCOUNT}:targetgroup/{name}/1"
    ))
}

fn placeholder_definition(family: &str) -> TaskDefinition {
    use tideway::spec::NetworkMode;
    use tideway::task::ContainerDefinition;

    TaskDefinition {
        family: family.to_string(),
        network_mode: NetworkMode::Bridge,
        task_role_arn: None,
        container: ContainerDefinition {
            name: family.to_string(),
            image: format!("{family}:previous"),
            essential: true,
            cpu: None,
            memory: Some(256),
            memory_reservation: None,
            port_mappings: Vec::new(),
            environment: Vec::new(),
            log_configuration: None,
        },
    }
}
