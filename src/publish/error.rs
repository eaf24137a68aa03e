// ABOUTME: Image publisher error types with SNAFU pattern.
// ABOUTME: Distinguishes missing repository settings, registry calls, spawn failures and docker commands.

use snafu::Snafu;

use crate::provider::ProviderError;
use crate::types::ParseImageUriError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PublishError {
    #[snafu(display("image repository is not configured: repository.{missing} is missing"))]
    RepositoryNotConfigured { missing: &'static str },

    #[snafu(display("failed to run `{command}`: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("`{command}` exited with {status}: {stderr}"))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[snafu(display("registry call {operation} failed: {source}"))]
    Registry {
        operation: &'static str,
        source: ProviderError,
    },

    #[snafu(display("published image reference is invalid: {source}"))]
    InvalidImage { source: ParseImageUriError },
}
