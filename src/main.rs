use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// deckctl — Stream Deck session daemon bridging key presses to OBS hotkeys
#[derive(Parser)]
#[command(name = "deckctl", version, about)]
struct Cli {
    /// Path to the config file (TOML).
    #[arg(short, long, default_value = "/etc/deckctl/config.toml")]
    config: PathBuf,

    /// Enable JSON log output (for journald).
    #[arg(long)]
    json: bool,

    /// Validate config and exit.
    #[arg(long)]
    check: bool,
}

/// Exit status when discovery finds no panel.
const EXIT_NO_DEVICE: i32 = -1;
/// Exit status when discovery finds more than one panel.
const EXIT_MULTIPLE_DEVICES: i32 = -2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Init tracing.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("deckctl=info"));

    if cli.json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    info!("deckctl v{}", env!("CARGO_PKG_VERSION"));

    let config = deckctl::config::load(&cli.config)?;

    if cli.check {
        println!(
            "config OK: brightness {}, obs endpoint {}:{}",
            config.streamdeck.brightness, config.obs.host, config.obs.port
        );
        return Ok(());
    }

    match deckctl::session::run(config).await {
        Ok(()) => Ok(()),
        Err(e @ deckctl::error::DeckError::NoDevice) => {
            error!("{e}");
            std::process::exit(EXIT_NO_DEVICE);
        }
        Err(e @ deckctl::error::DeckError::MultipleDevices(_)) => {
            error!("{e}");
            std::process::exit(EXIT_MULTIPLE_DEVICES);
        }
        Err(e) => Err(e.into()),
    }
}
