// ABOUTME: Regional cloud control-plane boundary.
// ABOUTME: Capability traits, shared request types, and the AWS SDK implementation.

mod aws;
mod error;
pub mod traits;
mod types;

pub use aws::{AwsConnector, AwsControlPlane};
pub(crate) use aws::request_error;
pub use error::{NotFoundExt, ProviderError};
pub use traits::{
    ClusterOps, Connector, ControlPlane, LoadBalancerOps, LogGroupOps, ServiceOps,
    TaskDefinitionOps,
};
pub use types::*;
