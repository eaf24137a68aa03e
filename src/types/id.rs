// ABOUTME: Phantom-typed Amazon Resource Names for compile-time type safety.
// ABOUTME: Prevents passing a target group ARN where a task definition ARN is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum ClusterMarker {}
pub enum ServiceMarker {}
pub enum TaskDefinitionMarker {}
pub enum LoadBalancerMarker {}
pub enum TargetGroupMarker {}
pub enum ListenerMarker {}
pub enum RuleMarker {}

/// An opaque resource identifier returned by the control plane.
///
/// The marker type keeps ARNs of different resource kinds apart, so a
/// `ListenerArn` can never be handed to an operation expecting a `TargetGroupArn`.
#[must_use = "ARNs reference remote resources and should not be ignored"]
pub struct Arn<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Arn<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// The resource part of the ARN, after the last `/`.
    ///
    /// For a task definition this is `family:revision`.
    pub fn resource(&self) -> &str {
        self.value
            .rsplit_once('/')
            .map(|(_, resource)| resource)
            .unwrap_or(&self.value)
    }
}

impl Arn<TaskDefinitionMarker> {
    /// Revision number of a task definition ARN, if it carries one.
    pub fn revision(&self) -> Option<u32> {
        self.value
            .rsplit_once(':')
            .and_then(|(_, revision)| revision.parse().ok())
    }
}

// Manual trait implementations that don't require T to implement the trait.

impl<T> std::fmt::Debug for Arn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Arn").field(&self.value).finish()
    }
}

impl<T> Clone for Arn<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Arn<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Arn<T> {}

impl<T> Hash for Arn<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Arn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Arn<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Arn<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

pub type ClusterArn = Arn<ClusterMarker>;
pub type ServiceArn = Arn<ServiceMarker>;
pub type TaskDefinitionArn = Arn<TaskDefinitionMarker>;
pub type LoadBalancerArn = Arn<LoadBalancerMarker>;
pub type TargetGroupArn = Arn<TargetGroupMarker>;
pub type ListenerArn = Arn<ListenerMarker>;
pub type RuleArn = Arn<RuleMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_definition_revision_is_parsed() {
        let arn = TaskDefinitionArn::new(
            "arn:aws:ecs:us-east-1:123456789012:task-definition/billing-api:42",
        );
        assert_eq!(arn.revision(), Some(42));
        assert_eq!(arn.resource(), "billing-api:42");
    }

    #[test]
    fn resource_falls_back_to_whole_value() {
        let arn = ListenerArn::new("listener-1");
        assert_eq!(arn.resource(), "listener-1");
    }
}
