// ABOUTME: Load balancer provisioner: target group plus one forwarding rule per listener.
// ABOUTME: Load balancers are only discovered; rule priorities are appended after existing ones.

use crate::provider::{
    CreateRuleRequest, CreateTargetGroupRequest, ListenerDescription, LoadBalancerDescription,
    LoadBalancerOps, NotFoundExt, RuleCondition, RuleDescription, TargetGroupDescription,
};
use crate::spec::{LoadBalancerSpec, TargetGroupSpec};
use crate::types::{Region, TargetGroupArn};

use super::ensured::Ensured;
use super::error::{DeployError, ValidationError};

/// Port new target groups are created with. Registered tasks bring their own port.
pub const TARGET_GROUP_PORT: u16 = 80;

/// HTTP codes a target group counts as healthy.
pub const HEALTHY_HTTP_CODES: &str = "200-299";

const DEFAULT_PRIORITY: &str = "default";

/// The routing objects a service is bound to in one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub load_balancer: LoadBalancerDescription,
    pub target_group: Ensured<TargetGroupDescription>,
    /// The forwarding rule on each listener, in listener order.
    pub rules: Vec<Ensured<RuleDescription>>,
}

impl Routing {
    pub fn target_group_arn(&self) -> &TargetGroupArn {
        &self.target_group.value().arn
    }

    pub fn created_rules(&self) -> usize {
        self.rules.iter().filter(|rule| rule.was_created()).count()
    }
}

/// Rule conditions for the configured path and host predicates.
///
/// # Errors
///
/// Returns `ValidationError::MissingRoutingPredicate` when neither is set.
pub fn rule_conditions(spec: &LoadBalancerSpec) -> Result<Vec<RuleCondition>, ValidationError> {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut conditions = Vec::new();
    if let Some(path) = present(&spec.path) {
        conditions.push(RuleCondition::path_pattern(&path));
    }
    if let Some(host) = present(&spec.host) {
        conditions.push(RuleCondition::host_header(&host));
    }

    if conditions.is_empty() {
        return Err(ValidationError::MissingRoutingPredicate(spec.name.clone()));
    }
    Ok(conditions)
}

/// Priority for a rule appended after `priorities`.
///
/// `default` counts as 0; values that are not numbers are ignored. With no
/// usable priority at all the result is 1.
pub fn next_priority<'a>(priorities: impl IntoIterator<Item = &'a str>) -> u32 {
    priorities
        .into_iter()
        .filter_map(|priority| match priority.trim() {
            DEFAULT_PRIORITY => Some(0),
            numeric => numeric.parse::<u32>().ok(),
        })
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Ensure traffic matching the configured predicates reaches the service's target group.
///
/// # Errors
///
/// * `ValidationError` if no path or host predicate is configured.
/// * `DeployError::NotFound` if the load balancer does not exist.
/// * `DeployError::Infrastructure` if any provider call fails.
#[tracing::instrument(skip(client, spec), fields(region = %region, load_balancer = %spec.name))]
pub async fn ensure_routing<C>(
    client: &C,
    region: &Region,
    spec: &LoadBalancerSpec,
) -> Result<Routing, DeployError>
where
    C: LoadBalancerOps + ?Sized,
{
    let conditions = rule_conditions(spec)?;

    let load_balancer = client
        .describe_load_balancer(&spec.name)
        .await
        .or_absent()
        .map_err(DeployError::infrastructure(region, "DescribeLoadBalancers"))?
        .ok_or_else(|| DeployError::NotFound {
            region: region.clone(),
            resource: "load balancer",
            name: spec.name.clone(),
        })?;

    let target_group =
        ensure_target_group(client, region, &load_balancer, &spec.target_group).await?;

    let listeners = client
        .describe_listeners(&load_balancer.arn)
        .await
        .map_err(DeployError::infrastructure(region, "DescribeListeners"))?;
    if listeners.is_empty() {
        tracing::warn!("load balancer has no listeners; no rules created");
    }

    let mut rules = Vec::with_capacity(listeners.len());
    for listener in &listeners {
        let rule = ensure_rule(
            client,
            region,
            listener,
            &conditions,
            &target_group.value().arn,
        )
        .await?;
        rules.push(rule);
    }

    Ok(Routing {
        load_balancer,
        target_group,
        rules,
    })
}

async fn ensure_target_group<C>(
    client: &C,
    region: &Region,
    load_balancer: &LoadBalancerDescription,
    spec: &TargetGroupSpec,
) -> Result<Ensured<TargetGroupDescription>, DeployError>
where
    C: LoadBalancerOps + ?Sized,
{
    let existing = client
        .describe_target_groups(&load_balancer.arn)
        .await
        .map_err(DeployError::infrastructure(region, "DescribeTargetGroups"))?;

    if let Some(group) = existing.into_iter().find(|group| group.name == spec.name) {
        tracing::debug!(target_group = %group.name, "target group exists");
        return Ok(Ensured::Existing(group));
    }

    let request = CreateTargetGroupRequest {
        name: spec.name.clone(),
        vpc_id: load_balancer.vpc_id.clone(),
        port: TARGET_GROUP_PORT,
        health_check: spec.health_check.clone(),
        matcher: HEALTHY_HTTP_CODES.to_string(),
    };
    let group = client
        .create_target_group(&request)
        .await
        .map_err(DeployError::infrastructure(region, "CreateTargetGroup"))?;

    client
        .set_deregistration_delay(&group.arn, spec.deregistration_delay)
        .await
        .map_err(DeployError::infrastructure(
            region,
            "ModifyTargetGroupAttributes",
        ))?;

    tracing::info!(target_group = %group.name, "created target group");
    Ok(Ensured::Created(group))
}

async fn ensure_rule<C>(
    client: &C,
    region: &Region,
    listener: &ListenerDescription,
    conditions: &[RuleCondition],
    target_group: &TargetGroupArn,
) -> Result<Ensured<RuleDescription>, DeployError>
where
    C: LoadBalancerOps + ?Sized,
{
    let rules = client
        .describe_rules(&listener.arn)
        .await
        .map_err(DeployError::infrastructure(region, "DescribeRules"))?;

    if let Some(rule) = rules.iter().find(|rule| {
        rule.target_groups.contains(target_group) && same_conditions(&rule.conditions, conditions)
    }) {
        tracing::debug!(listener = %listener.arn, priority = %rule.priority, "matching rule exists");
        return Ok(Ensured::Existing(rule.clone()));
    }

    let request = CreateRuleRequest {
        listener: listener.arn.clone(),
        priority: next_priority(rules.iter().map(|rule| rule.priority.as_str())),
        conditions: conditions.to_vec(),
        target_group: target_group.clone(),
    };
    let rule = client
        .create_rule(&request)
        .await
        .map_err(DeployError::infrastructure(region, "CreateRule"))?;

    tracing::info!(listener = %listener.arn, priority = request.priority, "created rule");
    Ok(Ensured::Created(rule))
}

fn same_conditions(existing: &[RuleCondition], wanted: &[RuleCondition]) -> bool {
    existing.len() == wanted.len() && wanted.iter().all(|c| existing.contains(c))
}
