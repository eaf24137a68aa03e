// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tideway::config::{DEFAULT_ENVIRONMENT, Overrides};

#[derive(Parser)]
#[command(name = "tideway")]
#[command(about = "Deploy a container service to Amazon ECS in several regions at once")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI (only the final result)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Output JSON lines for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tideway.yml configuration file
    Init {
        /// Name used for the service, cluster and task family
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Publish the image and deploy it to every configured region
    Deploy {
        #[command(flatten)]
        target: Target,

        /// Deploy an already published image instead of building one
        #[arg(long, env = "TIDEWAY_IMAGE")]
        image: Option<String>,

        /// Named AWS profile to load credentials from
        #[arg(long, env = "AWS_PROFILE")]
        profile: Option<String>,
    },

    /// Print the task definition that would be registered, without calling AWS
    Render {
        #[command(flatten)]
        target: Target,

        /// Region to render for (defaults to the first configured region)
        #[arg(short, long)]
        region: Option<String>,

        /// Image to render (defaults to the configured repository and tag)
        #[arg(long, env = "TIDEWAY_IMAGE")]
        image: Option<String>,
    },
}

/// Which configuration to load and how to adjust it.
#[derive(Debug, clap::Args)]
pub struct Target {
    /// Configuration file (defaults to tideway.yml in the current directory)
    #[arg(short, long, env = "TIDEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment section to apply
    #[arg(short, long, env = "TIDEWAY_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub env: String,

    #[command(flatten)]
    pub overrides: Overrides,
}
