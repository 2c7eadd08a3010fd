use clap::Parser;

use mediaprep::cli::{self, Cli, Command, ConfigCommand};
use mediaprep::config::{self, ClientConfig};
use mediaprep::logging::{self, LoggingConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `config path` and `version` work even with a broken config file.
    let needs_config = !matches!(
        cli.command,
        Command::Version | Command::Config(ConfigCommand::Path)
    );
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) if needs_config => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
        Err(_) => ClientConfig::default(),
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("warning: {e}; falling back to default logging");
        let _ = logging::init_logging(&LoggingConfig::default());
    }

    if let Err(e) = cli::run(cli, config).await {
        tracing::debug!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
