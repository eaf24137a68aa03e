// ABOUTME: Deploy command implementation.
// ABOUTME: Publishes the image, runs the regional reconciler against AWS and renders progress.

use super::load_config;
use crate::cli::Target;
use tideway::deploy::{Progress, Reconciler};
use tideway::error::{Error, Result};
use tideway::output::{Output, OutputMode};
use tideway::provider::AwsConnector;
use tideway::publish::{DockerPublisher, EcrRegistry, ImagePublisher, PublishPlan};
use tideway::types::ImageUri;

/// Publish (unless `image` is given) and deploy to every configured region.
pub async fn deploy(
    target: Target,
    image: Option<String>,
    profile: Option<String>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let config = load_config(&target)?;
    let spec = config.to_spec()?;

    let connector = match profile {
        Some(profile) => AwsConnector::with_profile(profile),
        None => AwsConnector::new(),
    };

    let image = match image {
        Some(image) => ImageUri::parse(&image)
            .map_err(|e| Error::InvalidConfig(format!("--image {image}: {e}")))?,
        None => {
            let plan = PublishPlan::from_config(&config, &spec.tag)?;
            output.progress(&format!("Publishing {}", plan.remote));
            let registry = EcrRegistry::new(
                &connector.sdk_config(&plan.registry_region).await,
                plan.registry_id.clone(),
            );
            DockerPublisher::new(registry).publish(&plan).await?
        }
    };

    output.progress(&format!(
        "Deploying {} ({}) to {} region(s)",
        spec.name,
        image,
        spec.regions.len()
    ));

    let (progress, mut events) = Progress::channel();
    let renderer = {
        let output = output.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                output.event(&event);
            }
        })
    };

    // The reconciler owns the only sender; dropping it ends the renderer.
    let result = Reconciler::new(connector)
        .with_progress(progress)
        .deploy(&spec, &image.to_string())
        .await;
    if let Err(e) = renderer.await {
        tracing::warn!(error = %e, "progress renderer stopped early");
    }

    match result {
        Ok(report) => {
            output.report(&report);
            output.success(&format!(
                "Deployed {image} to {} region(s)",
                report.outcomes.len()
            ));
            Ok(())
        }
        Err(e) => {
            if let (OutputMode::Json, Some(report)) = (output.mode(), e.report()) {
                output.report(report);
            }
            Err(e.into())
        }
    }
}
