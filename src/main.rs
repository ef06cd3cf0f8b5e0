//! Main module for the Parts Scout CLI application (pscout).
//!
//! This module parses the command line, loads the configuration and hands the
//! selected subcommand to [`parts_scout::app::App`].
//!
//! # Examples
//!
//! ```sh
//! pscout init
//! pscout login -e ana@example.com
//! pscout ask "front brake pads for a 2015 Golf"
//! pscout products search "BP-2024" --part-number
//! pscout --debug history
//! ```

use clap::Parser;
use once_cell::sync::OnceCell;
use std::error::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use parts_scout::{
    app::{self, App},
    commands::{Cli, Commands},
};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Parse arguments, load the config and execute the subcommand.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the command fails.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = app::config_path(cli.config.as_deref())?;

    if let Commands::Init { force } = cli.command {
        debug!("Initializing configuration");
        return app::init(&config_path, force);
    }

    debug!("Loading config from: {}", config_path.display());
    let config = app::load_or_default(&config_path)?;
    debug!("Config loaded: {:?}", config);

    let mut app = App::new(config, cli.debug)?;
    app.run(cli.command).await
}
