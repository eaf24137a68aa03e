// ABOUTME: Image publisher: logs into the registry, ensures the repository, builds, tags and pushes.
// ABOUTME: Produces the canonical image URI the deployment registers in every region.

mod ecr;
mod error;
mod registry;

pub use ecr::EcrRegistry;
pub use error::PublishError;
pub use registry::{ContainerRegistry, RegistryLogin, ensure_repository};

use async_trait::async_trait;
use snafu::{ResultExt, ensure};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::Config;
use crate::types::ImageUri;

use error::{CommandFailedSnafu, InvalidImageSnafu, RegistrySnafu, SpawnSnafu};

/// What to build and where to push it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    /// Image built locally, `<name>:latest`.
    pub local_image: String,
    /// Repository image the tag is pushed to.
    pub remote: ImageUri,
    /// Repository name inside the registry.
    pub repository: String,
    /// Account that owns the registry.
    pub registry_id: String,
    pub registry_region: String,
    pub context: PathBuf,
    pub build_args: Vec<String>,
}

impl PublishPlan {
    /// Plan a publish of `tag` to the configured repository.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::RepositoryNotConfigured` unless account, region
    /// and repository name are all set.
    pub fn from_config(config: &Config, tag: &str) -> Result<Self, PublishError> {
        let repository = &config.repository;
        let account_id = required(repository.account_id.as_deref(), "account_id")?;
        let region = required(repository.region.as_deref(), "region")?;
        let name = required(repository.name.as_deref(), "name")?;

        let remote = ImageUri::parse(&format!(
            "{}:{tag}",
            ImageUri::ecr_repository(account_id, region, name)
        ))
        .context(InvalidImageSnafu)?;

        Ok(Self {
            local_image: format!("{}:latest", config.name),
            remote,
            repository: name.to_string(),
            registry_id: account_id.to_string(),
            registry_region: region.to_string(),
            context: config.docker.context.clone(),
            build_args: config.docker.build_args.clone(),
        })
    }

    /// `docker login` arguments; the password is written to stdin.
    pub fn login_args(&self, login: &RegistryLogin) -> Vec<String> {
        vec![
            "login".to_string(),
            "--username".to_string(),
            login.username.clone(),
            "--password-stdin".to_string(),
            login.endpoint.clone(),
        ]
    }

    /// Docker invocations after login, in execution order: build, tag, push.
    pub fn commands(&self) -> Vec<Vec<String>> {
        let mut build = vec![
            "build".to_string(),
            "-t".to_string(),
            self.local_image.clone(),
        ];
        for arg in &self.build_args {
            build.push("--build-arg".to_string());
            build.push(arg.clone());
        }
        build.push(self.context.display().to_string());

        let remote = self.remote.to_string();
        vec![
            build,
            vec!["tag".to_string(), self.local_image.clone(), remote.clone()],
            vec!["push".to_string(), remote],
        ]
    }
}

fn required<'a>(value: Option<&'a str>, missing: &'static str) -> Result<&'a str, PublishError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(PublishError::RepositoryNotConfigured { missing })
}

/// Publishes the image a deployment will run.
#[async_trait]
pub trait ImagePublisher: Send + Sync {
    async fn publish(&self, plan: &PublishPlan) -> Result<ImageUri, PublishError>;
}

/// Shells out to the docker CLI against a container registry.
#[derive(Debug, Clone)]
pub struct DockerPublisher<R> {
    program: PathBuf,
    registry: R,
}

impl<R: ContainerRegistry> DockerPublisher<R> {
    pub fn new(registry: R) -> Self {
        Self {
            program: PathBuf::from("docker"),
            registry,
        }
    }

    /// Use a different docker-compatible executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<(), PublishError> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        tracing::info!(%command, "running docker");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context(SpawnSnafu {
                command: command.clone(),
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // A child that exits without reading reports through its status.
            match pipe.write_all(input.as_bytes()).await {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(e).context(SpawnSnafu { command });
                }
                _ => {}
            }
        }

        let output = child.wait_with_output().await.context(SpawnSnafu {
            command: command.clone(),
        })?;

        ensure!(
            output.status.success(),
            CommandFailedSnafu {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        );
        Ok(())
    }
}

#[async_trait]
impl<R: ContainerRegistry> ImagePublisher for DockerPublisher<R> {
    async fn publish(&self, plan: &PublishPlan) -> Result<ImageUri, PublishError> {
        let login = self.registry.login().await.context(RegistrySnafu {
            operation: "GetAuthorizationToken",
        })?;
        self.run(&plan.login_args(&login), Some(&login.password))
            .await?;

        let repository = ensure_repository(&self.registry, &plan.repository).await?;
        tracing::info!(
            repository = %repository.value(),
            status = repository.verb(),
            "image repository ready"
        );

        for args in plan.commands() {
            self.run(&args, None).await?;
        }
        Ok(plan.remote.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use parking_lot::Mutex;

    fn config(repository: &str) -> Config {
        Config::from_yaml(&format!(
            r#"
name: shop
version: 2.0.0
regions: us-east-1
cluster: main
service: {{ name: shop }}
task: {{ family: shop }}
container: {{ name: web, memory: 256 }}
docker:
  build_args: [NPM_TOKEN]
{repository}
"#
        ))
        .unwrap()
    }

    const REPOSITORY: &str =
        "repository:\n  account_id: \"123456789012\"\n  region: eu-west-1\n  name: shop\n";

    const REPOSITORY_URI: &str = "123456789012.dkr.ecr.eu-west-1.amazonaws.com/shop";

    #[derive(Default)]
    struct StubRegistry {
        existing: Option<String>,
        login_fails: bool,
        created: Mutex<Vec<String>>,
    }

    impl StubRegistry {
        fn with_repository() -> Self {
            Self {
                existing: Some(REPOSITORY_URI.to_string()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ContainerRegistry for StubRegistry {
        async fn login(&self) -> Result<RegistryLogin, ProviderError> {
            if self.login_fails {
                return Err(ProviderError::request("ExpiredToken"));
            }
            Ok(RegistryLogin {
                username: "AWS".to_string(),
                password: "hunter2".to_string(),
                endpoint: "https://123456789012.dkr.ecr.eu-west-1.amazonaws.com".to_string(),
            })
        }

        async fn describe_repository(&self, _name: &str) -> Result<Option<String>, ProviderError> {
            match &self.existing {
                Some(uri) => Ok(Some(uri.clone())),
                None => Err(ProviderError::not_found("repository")),
            }
        }

        async fn create_repository(&self, name: &str) -> Result<String, ProviderError> {
            self.created.lock().push(name.to_string());
            Ok(REPOSITORY_URI.to_string())
        }
    }

    fn plan() -> PublishPlan {
        PublishPlan::from_config(&config(REPOSITORY), "2.0.0").unwrap()
    }

    #[test]
    fn plan_targets_ecr_repository() {
        let plan = plan();
        assert_eq!(plan.remote.to_string(), format!("{REPOSITORY_URI}:2.0.0"));
        assert_eq!(plan.local_image, "shop:latest");
        assert_eq!(plan.repository, "shop");
        assert_eq!(plan.registry_id, "123456789012");
        assert_eq!(plan.registry_region, "eu-west-1");
    }

    #[test]
    fn login_reads_the_password_from_stdin() {
        let login = RegistryLogin {
            username: "AWS".to_string(),
            password: "hunter2".to_string(),
            endpoint: "https://registry".to_string(),
        };
        let args = plan().login_args(&login);
        assert_eq!(
            args,
            ["login", "--username", "AWS", "--password-stdin", "https://registry"]
        );
        assert!(!args.iter().any(|arg| arg.contains("hunter2")));
    }

    #[test]
    fn commands_build_tag_and_push_in_order() {
        let plan = plan();
        let commands = plan.commands();
        assert_eq!(
            commands[0],
            ["build", "-t", "shop:latest", "--build-arg", "NPM_TOKEN", "."]
        );
        assert_eq!(commands[1][0], "tag");
        assert_eq!(commands[2], ["push".to_string(), plan.remote.to_string()]);
    }

    #[test]
    fn missing_repository_settings_are_reported() {
        let err = PublishPlan::from_config(&config(""), "2.0.0").unwrap_err();
        assert!(matches!(
            err,
            PublishError::RepositoryNotConfigured {
                missing: "account_id"
            }
        ));
    }

    #[tokio::test]
    async fn missing_repository_is_created() {
        let registry = StubRegistry::default();
        let repository = ensure_repository(&registry, "shop").await.unwrap();
        assert!(repository.was_created());
        assert_eq!(*registry.created.lock(), ["shop"]);
    }

    #[tokio::test]
    async fn existing_repository_is_reused() {
        let registry = StubRegistry::with_repository();
        let repository = ensure_repository(&registry, "shop").await.unwrap();
        assert_eq!(repository, crate::deploy::Ensured::Existing(REPOSITORY_URI.to_string()));
        assert!(registry.created.lock().is_empty());
    }

    #[tokio::test]
    async fn login_failure_stops_before_docker_runs() {
        let registry = StubRegistry {
            login_fails: true,
            ..StubRegistry::default()
        };
        // A missing program would surface as a spawn error if docker ran.
        let err = DockerPublisher::new(registry)
            .with_program("/nonexistent/tideway-docker")
            .publish(&plan())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Registry {
                operation: "GetAuthorizationToken",
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_surfaces_exit_status() {
        let err = DockerPublisher::new(StubRegistry::with_repository())
            .with_program("false")
            .publish(&plan())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_publish_creates_repository_and_returns_remote_image() {
        let publisher = DockerPublisher::new(StubRegistry::default()).with_program("true");
        let plan = plan();
        let image = publisher.publish(&plan).await.unwrap();
        assert_eq!(image, plan.remote);
        assert_eq!(*publisher.registry.created.lock(), ["shop"]);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = DockerPublisher::new(StubRegistry::with_repository())
            .with_program("/nonexistent/tideway-docker")
            .publish(&plan())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Spawn { .. }));
    }
}
