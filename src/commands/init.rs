// ABOUTME: Init command implementation.
// ABOUTME: Writes a starter tideway.yml into the current directory.

use std::env;
use tideway::config;
use tideway::error::Result;
use tideway::output::Output;

pub fn init(name: Option<&str>, force: bool, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let path = config::init_config(&cwd, name, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}
