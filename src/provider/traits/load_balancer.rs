// ABOUTME: Load balancer operations trait for the regional control plane.
// ABOUTME: Discovery of balancers and listeners, target groups and listener rules.

use async_trait::async_trait;
use std::time::Duration;

use crate::provider::{
    CreateRuleRequest, CreateTargetGroupRequest, ListenerDescription, LoadBalancerDescription,
    ProviderError, RuleDescription, TargetGroupDescription,
};
use crate::types::{ListenerArn, LoadBalancerArn, TargetGroupArn};

/// Routing operations. Load balancers themselves are only ever discovered.
#[async_trait]
pub trait LoadBalancerOps: Send + Sync {
    async fn describe_load_balancer(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancerDescription>, ProviderError>;

    /// Target groups attached to a load balancer; empty when it has none.
    async fn describe_target_groups(
        &self,
        load_balancer: &LoadBalancerArn,
    ) -> Result<Vec<TargetGroupDescription>, ProviderError>;

    async fn create_target_group(
        &self,
        request: &CreateTargetGroupRequest,
    ) -> Result<TargetGroupDescription, ProviderError>;

    /// Set how long deregistering targets keep draining connections.
    async fn set_deregistration_delay(
        &self,
        target_group: &TargetGroupArn,
        delay: Duration,
    ) -> Result<(), ProviderError>;

    async fn describe_listeners(
        &self,
        load_balancer: &LoadBalancerArn,
    ) -> Result<Vec<ListenerDescription>, ProviderError>;

    async fn describe_rules(
        &self,
        listener: &ListenerArn,
    ) -> Result<Vec<RuleDescription>, ProviderError>;

    async fn create_rule(&self, request: &CreateRuleRequest)
    -> Result<RuleDescription, ProviderError>;
}
