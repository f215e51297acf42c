//! Nicksync binary
//!
//! Sets every Discord member's nickname to `[Corporation Ticker] Character Name`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nicksync_bot::{BotNode, Config, DEFAULT_CONFIG_PATH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "nicksync")]
#[command(about = "Keeps Discord nicknames in sync with registered identities")]
#[command(version)]
struct Args {
    /// The path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nicksync=info,nicksync_core=info,nicksync_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let node = match BotNode::start(config).await {
            Ok(node) => node,
            Err(e) => {
                tracing::error!("{}", e);
                return if e.is_startup_fatal() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                };
            }
        };

        // Runtime errors are logged by the node; shutdown is still clean.
        let _ = node.run().await;
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_flag_defaults_to_conventional_path() {
        let args = Args::try_parse_from(["nicksync"]).unwrap();
        assert_eq!(args.config, PathBuf::from("./config.toml"));
    }

    #[test]
    fn config_flag_short_and_long() {
        let short = Args::try_parse_from(["nicksync", "-c", "/etc/nicksync.toml"]).unwrap();
        assert_eq!(short.config, PathBuf::from("/etc/nicksync.toml"));

        let long = Args::try_parse_from(["nicksync", "--config", "bot.toml"]).unwrap();
        assert_eq!(long.config, PathBuf::from("bot.toml"));
    }

    #[test]
    fn no_subcommands() {
        assert!(Args::try_parse_from(["nicksync", "serve"]).is_err());
    }
}
