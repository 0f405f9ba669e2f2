use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rollgate_core::{DeployConfig, DeployResult};
use rollgate_health::HttpProber;
use rollgate_rollout::{DeployController, DeploymentBackend};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::OutputFormat;

/// Load the config, then run one deploy.
///
/// Config errors are returned before any backend call is made; every
/// deploy outcome, failed or not, comes back as `Ok(DeployResult)`.
pub async fn run(
    config_path: &Path,
    image_tag: &str,
    backend: Arc<dyn DeploymentBackend>,
    prober: Arc<dyn HttpProber>,
    cancel: &CancellationToken,
) -> anyhow::Result<DeployResult> {
    let config = DeployConfig::from_file(config_path, image_tag)
        .with_context(|| format!("failed to load deploy config {}", config_path.display()))?;

    info!(
        service = %config.service_name,
        namespace = %config.namespace,
        image = %config.image,
        replicas = config.replicas,
        timeout_seconds = config.timeout_seconds,
        rollback_on_failure = config.rollback_on_failure,
        "config loaded"
    );

    let controller = DeployController::new(backend, prober);
    let policy = controller.policy();
    info!(
        url = %config.health_url(),
        attempts = policy.max_attempts,
        worst_case_secs = policy.worst_case().as_secs(),
        "health check policy"
    );
    Ok(controller.deploy(&config, cancel).await)
}

pub fn render(result: &DeployResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            let mark = if result.is_success() { "✓" } else { "✗" };
            Ok(format!("{mark} {result}"))
        }
    }
}
