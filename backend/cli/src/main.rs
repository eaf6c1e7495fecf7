mod config_cmd;
mod doctor_cmd;
mod extract_cmd;
mod models_cmd;
mod runtime;
mod scan_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use cardscan_config::{config_dir, config_file_path, load_and_prepare};
use cardscan_core::FacingMode;

#[derive(Parser)]
#[command(name = "cardscan")]
#[command(about = "Scan business cards into structured contacts")]
#[command(version)]
struct Cli {
    /// Config file (default: $CARDSCAN_CONFIG_DIR/config.yaml or ~/.cardscan/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FacingArg {
    Rear,
    Front,
}

impl From<FacingArg> for FacingMode {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Rear => FacingMode::Rear,
            FacingArg::Front => FacingMode::Front,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open the camera, capture a card, review the fields, and save them
    Scan {
        /// Which camera to use
        #[arg(long, value_enum)]
        facing: Option<FacingArg>,
        /// Capture as soon as the camera is ready and save without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Extract fields from an existing image file
    Extract {
        #[arg(long)]
        image: PathBuf,
        /// Submit the result to the webhook
        #[arg(long)]
        save: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the models the API key can use
    Models {
        /// Include models outside the configured families
        #[arg(long)]
        all: bool,
    },
    /// Check configuration and camera availability
    Doctor,
    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let (config, report) = load_and_prepare(&config_path).await?;

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    cardscan_logging::init_logger(level, config.logging.dir.as_deref(), config.logging.json);
    debug!(path = %config_path.display(), "Configuration loaded");
    report.log();

    match cli.command {
        Commands::Scan { facing, yes } => {
            let facing = facing.map(FacingMode::from).unwrap_or(config.camera.facing);
            scan_cmd::run(&config, facing, yes).await
        }
        Commands::Extract { image, save, json } => extract_cmd::run(&config, &image, save, json).await,
        Commands::Models { all } => models_cmd::run(&config, all).await,
        Commands::Doctor => doctor_cmd::run(&config, &config_path).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(&config),
            ConfigAction::Init { force } => config_cmd::init(&config_path, force).await,
        },
    }
}
