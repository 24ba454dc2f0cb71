use clap::Parser;
use warden::{BridgeOrchestrator, ChainRole, Config, CycleResult};

/// Run one relay cycle per role and exit.
///
/// Meant to be invoked on a fixed interval by an external scheduler
/// (cron, systemd timer). Never run two instances against the same
/// warden key at once.
#[derive(Parser)]
#[command(name = "bridge-warden", version)]
#[command(
    about = "Custodial bridge warden: relays Deposit/Unwrap events between two EVM chains",
    long_about = None
)]
struct Cli {
    /// Roles to run, in order (default: source then destination)
    #[arg(value_parser = parse_role)]
    roles: Vec<ChainRole>,

    /// .env file to load before reading the environment
    #[arg(long, default_value = ".env")]
    env_file: String,
}

fn parse_role(raw: &str) -> Result<ChainRole, String> {
    raw.parse()
}

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    let cli = Cli::parse();

    let failed = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))?;

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns whether any cycle failed
async fn async_main(cli: Cli) -> eyre::Result<bool> {
    init_logging();

    let config = Config::load_from_file(&cli.env_file)?;
    tracing::info!(
        contract_info = %config.contract_info_path.display(),
        source_window = config.source.scan_window,
        destination_window = config.destination.scan_window,
        "Configuration loaded"
    );

    let orchestrator = BridgeOrchestrator::from_config(&config)?;
    tracing::info!(warden = %orchestrator.warden_address(), "Starting bridge warden");

    let roles = if cli.roles.is_empty() {
        ChainRole::ALL.to_vec()
    } else {
        cli.roles
    };

    let cycles = async {
        let mut failed = false;
        for role in roles {
            let result = orchestrator.run_cycle(role).await;
            log_result(&result);
            failed |= result.is_failed();
        }
        failed
    };

    let failed = tokio::select! {
        failed = cycles => failed,
        _ = wait_for_shutdown_signal() => {
            tracing::warn!("Interrupted, remaining cycles skipped");
            true
        }
    };

    if let Some(path) = &config.metrics_textfile {
        if let Err(e) = warden::metrics::write_textfile(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    tracing::info!(failed, "Bridge warden finished");
    Ok(failed)
}

fn log_result(result: &CycleResult) {
    match result {
        CycleResult::NoOp { role, scan } => {
            tracing::info!(
                role = %role,
                window = %scan.window,
                strategy = scan.strategy.unwrap_or("none"),
                "Cycle done: nothing to relay"
            );
        }
        CycleResult::Relayed { role, dispatch, .. } => {
            tracing::info!(
                role = %role,
                attempted = dispatch.attempted(),
                succeeded = dispatch.succeeded(),
                failed = dispatch.failed(),
                nonce_gaps = ?dispatch.nonce_gaps(),
                "Cycle done: relay attempted"
            );
        }
        CycleResult::Failed { role, stage, error } => {
            tracing::error!(role = %role, stage = %stage, error = %error, "Cycle failed");
        }
    }
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,warden=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
