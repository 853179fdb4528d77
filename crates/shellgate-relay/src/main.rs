//! shellgate-relay: browser terminal gateway.
//!
//! Serves `/ws/{id}`, resolves `id` against the configured connection
//! records and bridges each WebSocket to an SSH shell on the recorded host.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use shellgate_common::ConfigError;
use shellgate_config::GatewayConfig;
use shellgate_relay::{BridgeSettings, GatewayState, SshConnector, SshSettings, StaticLookup};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "shellgate-relay", about = "WebSocket to SSH terminal gateway")]
struct Args {
    /// Config file. Defaults to the per-user config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding `server.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Connection records file, overriding `store.records_path`.
    #[arg(short, long)]
    records: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overriding `logging.level`.
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let loaded = effective_config(&args);

    let level = args
        .log_level
        .clone()
        .or_else(|| {
            loaded
                .as_ref()
                .ok()
                .map(|config| config.logging.level.as_directive().to_string())
        })
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("shellgate_relay={level},shellgate_config={level}").into()
            }),
        )
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "could not load config");
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        println!("{}", shellgate_config::config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "shellgate-relay stopped");
            ExitCode::FAILURE
        }
    }
}

/// Config file plus command-line overrides, validated as a whole.
fn effective_config(args: &Args) -> Result<GatewayConfig, ConfigError> {
    let mut config = shellgate_config::load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    shellgate_config::validation::validate(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut GatewayConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(records) = &args.records {
        config.store.records_path = records.display().to_string();
    }
}

async fn run(config: GatewayConfig) -> shellgate_common::Result<()> {
    let lookup = if config.store.records_path.trim().is_empty() {
        tracing::warn!("no records file configured; every lookup will miss");
        StaticLookup::default()
    } else {
        StaticLookup::from_path(Path::new(&config.store.records_path))?
    };

    let state = GatewayState {
        lookup: Arc::new(lookup),
        connector: Arc::new(SshConnector::new(SshSettings::from(&config.ssh))),
        bridge: BridgeSettings::from(&config.relay),
    };

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        connect_timeout_secs = config.ssh.connect_timeout_secs,
        insecure_skip_host_verify = config.ssh.insecure_skip_host_verify,
        "shellgate-relay listening"
    );

    shellgate_relay::serve(listener, state, shutdown_signal()).await?;
    tracing::info!("shellgate-relay shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
