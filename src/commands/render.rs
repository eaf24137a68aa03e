// ABOUTME: Render command implementation.
// ABOUTME: Prints the region-stamped task definition payload without touching AWS.

use super::load_config;
use crate::cli::Target;
use tideway::deploy::DeployError;
use tideway::error::Result;
use tideway::publish::PublishPlan;
use tideway::task;

pub fn render(target: Target, region: Option<String>, image: Option<String>) -> Result<()> {
    let config = load_config(&target)?;
    let spec = config.to_spec()?;

    let region = match region {
        Some(name) => config.region(&name)?.clone(),
        None => spec.regions.first().clone(),
    };
    let image = match image {
        Some(image) => image,
        None => PublishPlan::from_config(&config, &spec.tag)?.remote.to_string(),
    };

    let definition = task::build(&spec, &image)
        .map_err(DeployError::from)?
        .for_region(&region);
    println!("{}", serde_json::to_string_pretty(&definition)?);
    Ok(())
}
