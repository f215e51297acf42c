//! Bot node - wires configuration, database, Discord and the sync engine.
//!
//! Architecture:
//! - Single process, single shared database pool and Discord connection
//! - One dispatcher task draining the command queue at the configured rate
//! - Sweep and profile-update tasks feeding the queue
//! - Ctrl-C closes Discord, cancels every task and exits cleanly

use std::sync::Arc;

use nicksync_core::{CommandQueue, Dispatcher, Platform, ProfileUpdate, Scheduler};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::database::MySqlIdentityResolver;
use crate::discord::DiscordSession;
use crate::error::Result;

/// A started bot: collaborators connected, sync tasks not yet running.
pub struct BotNode {
    config: Config,
    resolver: Arc<MySqlIdentityResolver>,
    session: DiscordSession,
    updates: mpsc::UnboundedReceiver<ProfileUpdate>,
}

impl BotNode {
    /// Connect to the database and build the Discord client.
    ///
    /// Errors here are startup-fatal.
    pub async fn start(config: Config) -> Result<Self> {
        tracing::info!("Nicksync starting");
        tracing::info!("  Database: {}:{}/{}", config.db_host, config.db_port, config.db_database);
        tracing::info!("  Command delay: {:?}", config.command_delay());
        tracing::info!("  Sweep interval: {:?}", config.sweep_interval());

        let resolver = Arc::new(MySqlIdentityResolver::connect(&config).await?);

        let (updates_tx, updates) = mpsc::unbounded_channel();
        let session = DiscordSession::connect(&config, updates_tx).await?;

        Ok(Self {
            config,
            resolver,
            session,
            updates,
        })
    }

    /// Run until interrupted or the Discord connection ends.
    ///
    /// Queued commands that have not been dispatched are discarded.
    pub async fn run(self) -> Result<()> {
        let BotNode {
            config,
            resolver,
            mut session,
            updates,
        } = self;

        let platform: Arc<dyn Platform> = Arc::new(session.platform());
        let closer = session.closer();
        let cancel = CancellationToken::new();
        let (queue, commands) = CommandQueue::new();

        let dispatcher = tokio::spawn(
            Dispatcher::new(Arc::clone(&platform), config.command_delay())
                .run(commands, cancel.clone()),
        );

        let scheduler = Scheduler::new(Arc::clone(&platform), resolver.clone(), queue)
            .with_sweep_interval(config.sweep_interval())
            .start_with_token(updates, cancel.clone());

        let result = tokio::select! {
            result = session.run() => {
                if let Err(e) = &result {
                    tracing::error!("Discord client error: {}", e);
                }
                result
            }
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => tracing::info!("Interrupted, shutting down"),
                    Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
                }
                Ok(())
            }
        };

        closer.close().await;
        cancel.cancel();
        scheduler.join().await;

        match dispatcher.await {
            Ok(stats) => tracing::info!(
                succeeded = stats.succeeded,
                failed = stats.failed,
                "Command dispatcher stopped"
            ),
            Err(e) => tracing::error!("Command dispatcher task failed: {}", e),
        }

        resolver.close().await;
        tracing::info!("Nicksync stopped");
        result
    }
}
