use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "rollgate",
    about = "rollgate — rolling deploys with health verification and automatic rollback",
    version
)]
struct Cli {
    /// Deploy config file (YAML, or TOML with a .toml extension)
    config: PathBuf,
    /// Image to deploy, e.g. registry/api:1.4.2
    image_tag: String,
    /// kubectl binary to invoke
    #[arg(long, default_value = "kubectl")]
    kubectl: String,
    /// Seconds before a hung `set image` or `rollout undo` is killed
    #[arg(long, default_value = "60")]
    command_timeout: u64,
    /// Result output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,rollgate=info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    // Ctrl-C cancels between stages; an in-flight rollback still completes.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling deploy");
            trigger.cancel();
        }
    });

    let backend = Arc::new(
        rollgate_rollout::KubectlBackend::new(&cli.kubectl)
            .with_command_timeout(Duration::from_secs(cli.command_timeout)),
    );
    let prober = Arc::new(rollgate_health::HyperProber::new());

    let result =
        match commands::deploy::run(&cli.config, &cli.image_tag, backend, prober, &cancel).await {
            Ok(result) => result,
            Err(e) => {
                let error = format!("{e:#}");
                error!(%error, "deploy aborted");
                return ExitCode::FAILURE;
            }
        };

    match commands::deploy::render(&result, cli.output) {
        Ok(out) => println!("{out}"),
        Err(e) => error!(error = %e, "failed to render result"),
    }
    ExitCode::from(result.exit_code())
}
