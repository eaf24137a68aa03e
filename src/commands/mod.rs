// ABOUTME: Command module aggregator for the tideway CLI.
// ABOUTME: Re-exports init, deploy and render handlers and shared config loading.

mod deploy;
mod init;
mod render;

pub use deploy::deploy;
pub use init::init;
pub use render::render;

use crate::cli::Target;
use std::env;
use tideway::config::{Config, ConfigFile};
use tideway::error::{Error, Result};

/// Load the selected configuration file and resolve it for the chosen environment.
fn load_config(target: &Target) -> Result<Config> {
    let file = match &target.config {
        Some(path) if !path.exists() => return Err(Error::ConfigNotFound(path.clone())),
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::discover(&env::current_dir()?)?,
    };
    tracing::debug!(environment = %target.env, "resolving configuration");
    file.resolve(&target.env, &target.overrides)
}
