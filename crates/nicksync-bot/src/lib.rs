//! Nicksync Bot - Discord nickname synchronisation
//!
//! Keeps every member's nickname set to `[TICKER] Character Name` as recorded
//! in the alliance auth database.
//!
//! # Architecture
//!
//! - **Config**: flat TOML file with credentials and tunables
//! - **Database**: MySQL-backed [`IdentityResolver`](nicksync_core::IdentityResolver)
//! - **Discord**: serenity client, event forwarding and the
//!   [`Platform`](nicksync_core::Platform) adapter
//! - **Node**: startup wiring and the run loop
//!
//! # Example
//!
//! ```no_run
//! use nicksync_bot::{BotNode, Config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("./config.toml")?;
//!     let node = BotNode::start(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod discord;
pub mod error;
pub mod node;

pub use config::{Config, DEFAULT_CONFIG_PATH};
pub use database::MySqlIdentityResolver;
pub use discord::{DiscordPlatform, DiscordSession};
pub use error::{ConfigError, Error, Result};
pub use node::BotNode;
