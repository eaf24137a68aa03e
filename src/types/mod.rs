// ABOUTME: Validated domain types and phantom-typed resource identifiers.
// ABOUTME: Names, regions, ARNs and image URIs shared by config, provider and deploy.

mod id;
mod image_uri;
mod region;
mod resource_name;

pub use id::{
    Arn, ClusterArn, LoadBalancerArn, ListenerArn, RuleArn, ServiceArn, TargetGroupArn,
    TaskDefinitionArn, TaskDefinitionMarker,
};
pub use image_uri::{ImageUri, ParseImageUriError};
pub use region::{Region, RegionError};
pub use resource_name::{ResourceName, ResourceNameError};
