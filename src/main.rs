use anyhow::{Context, Result};
use clap::Parser;
use portsync::config::{self, Overrides};
use portsync::integrations::qbittorrent::QbitClient;
use portsync::sync::{self, SyncState};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "portsync")]
#[command(about = "Keep qBittorrent's listening port in sync with a VPN forwarded-port file")]
#[command(version)]
struct Args {
    /// qBittorrent WebUI base URL
    #[arg(long, env = "QBITTORRENT_URL")]
    url: Option<String>,

    /// WebUI username
    #[arg(long, env = "QBITTORRENT_USERNAME")]
    username: Option<String>,

    /// WebUI password
    #[arg(long, env = "QBITTORRENT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// File containing the forwarded port
    #[arg(long, env = "PORT_FILE")]
    port_file: Option<PathBuf>,

    /// Seconds between checks
    #[arg(long, env = "CHECK_INTERVAL")]
    interval: Option<String>,

    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Run a single sync cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            port_file: self.port_file.clone(),
            check_interval: self.interval.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_tracing(args.json) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("portsync=info".parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    tracing::info!("qBittorrent Port Sync starting...");

    let config = config::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;

    tracing::info!("Configuration loaded:");
    tracing::info!("  qBittorrent URL: {}", config.url);
    tracing::info!("  Username: {}", config.username);
    tracing::info!("  Port file: {}", config.port_file.display());
    tracing::info!("  Check interval: {:?}", config.check_interval);

    let mut client = QbitClient::new(
        &config.url,
        &config.username,
        &config.password,
        config.request_timeout,
    )
    .context("Failed to create qBittorrent client")?;

    client.login().await.context("Initial login failed")?;

    sync::wait_for_port_file(&config.port_file, config.wait_poll).await;

    if args.once {
        let mut state = SyncState::default();
        let outcome = sync::sync_once(&mut client, &config.port_file, &mut state).await;
        return Ok(if outcome.is_aborted() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    sync::run(&mut client, &config.port_file, config.check_interval).await;
    Ok(ExitCode::SUCCESS)
}
