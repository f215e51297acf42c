//! Discord adapter.
//!
//! [`DiscordSession`] owns the gateway client. Its event handler publishes
//! readiness and forwards member updates; [`DiscordPlatform`] is the
//! [`Platform`] view handed to the core.

use std::sync::Arc;

use async_trait::async_trait;
use nicksync_core::{
    CommunityId, Member, MemberId, Platform, PlatformError, ProfileUpdate, ReadySignal,
};
use serenity::all::{
    Cache, Client, Context, EditMember, EventHandler, GatewayIntents, GuildId,
    GuildMemberUpdateEvent, Http, Member as DiscordMember, Ready, ShardManager, UserId,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;

/// Members fetched per HTTP page (Discord's maximum).
const MEMBER_PAGE_SIZE: u64 = 1000;

/// Core snapshot of a guild member from its Discord parts.
fn snapshot(user: UserId, guild: GuildId, handle: &str, nick: Option<&str>) -> Member {
    Member::new(
        MemberId(user.get()),
        CommunityId(guild.get()),
        handle,
        nick.map(str::to_string),
    )
}

fn to_member(member: &DiscordMember) -> Member {
    snapshot(
        member.user.id,
        member.guild_id,
        &member.user.name,
        member.nick.as_deref(),
    )
}

/// The update event carries the new nickname; the cached member, if any, the old one.
fn profile_update(before: Option<&DiscordMember>, event: &GuildMemberUpdateEvent) -> ProfileUpdate {
    ProfileUpdate {
        before: before.map(to_member),
        after: snapshot(
            event.user.id,
            event.guild_id,
            &event.user.name,
            event.nick.as_deref(),
        ),
    }
}

fn platform_error(e: serenity::Error) -> PlatformError {
    let status = match &e {
        serenity::Error::Http(http) => http.status_code().map(|code| code.as_u16()),
        _ => None,
    };
    classify(status, e.to_string())
}

/// Discord answered with a status: the call was rejected. No answer: connection failure.
fn classify(status: Option<u16>, message: String) -> PlatformError {
    match status {
        Some(_) => PlatformError::Rejected(message),
        None => PlatformError::Connection(message),
    }
}

/// Gateway event handler.
struct Handler {
    ready: ReadySignal,
    updates: mpsc::UnboundedSender<ProfileUpdate>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {} ({})", ready.user.name, ready.user.id);
        self.ready.set_ready(MemberId(ready.user.id.get()));
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        old_if_available: Option<DiscordMember>,
        _new: Option<DiscordMember>,
        event: GuildMemberUpdateEvent,
    ) {
        let update = profile_update(old_if_available.as_ref(), &event);

        if self.updates.send(update).is_err() {
            debug!("Profile update listener gone, dropping update");
        }
    }
}

/// A connected Discord client.
pub struct DiscordSession {
    client: Client,
    ready: ReadySignal,
}

impl DiscordSession {
    /// Build the client; member updates are forwarded to `updates`.
    pub async fn connect(
        config: &Config,
        updates: mpsc::UnboundedSender<ProfileUpdate>,
    ) -> Result<Self> {
        let ready = ReadySignal::new();
        let handler = Handler {
            ready: ready.clone(),
            updates,
        };

        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
        let client = Client::builder(&config.bot_password, intents)
            .event_handler(handler)
            .await?;

        info!(account = %config.bot_email, "Discord client created");
        Ok(Self { client, ready })
    }

    /// The [`Platform`] view of this session.
    pub fn platform(&self) -> DiscordPlatform {
        DiscordPlatform {
            http: Arc::clone(&self.client.http),
            cache: Arc::clone(&self.client.cache),
            ready: self.ready.clone(),
        }
    }

    /// Handle that can close the session while [`run`](Self::run) is pending.
    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            shards: Arc::clone(&self.client.shard_manager),
            ready: self.ready.clone(),
        }
    }

    /// Log in and process gateway events until the connection ends.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.client.start().await;
        self.ready.set_closed();
        Ok(result?)
    }
}

/// Closes a [`DiscordSession`] from outside its run loop.
#[derive(Clone)]
pub struct SessionCloser {
    shards: Arc<ShardManager>,
    ready: ReadySignal,
}

impl SessionCloser {
    pub async fn close(&self) {
        self.ready.set_closed();
        self.shards.shutdown_all().await;
        info!("Discord connection closed");
    }
}

/// [`Platform`] backed by Discord's HTTP API.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    ready: ReadySignal,
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn wait_until_ready(&self) -> std::result::Result<MemberId, PlatformError> {
        self.ready.wait().await
    }

    async fn members(&self) -> std::result::Result<Vec<Member>, PlatformError> {
        if self.ready.is_closed() {
            return Err(PlatformError::Closed);
        }

        let mut members = Vec::new();
        for guild_id in self.cache.guilds() {
            let mut after: Option<UserId> = None;
            loop {
                let page = guild_id
                    .members(&self.http, Some(MEMBER_PAGE_SIZE), after)
                    .await
                    .map_err(platform_error)?;

                after = page.last().map(|m| m.user.id);
                members.extend(page.iter().map(to_member));

                if (page.len() as u64) < MEMBER_PAGE_SIZE {
                    break;
                }
            }
        }

        Ok(members)
    }

    async fn change_display_name(
        &self,
        member: &Member,
        new_name: &str,
    ) -> std::result::Result<(), PlatformError> {
        GuildId::new(member.community.0)
            .edit_member(
                &*self.http,
                UserId::new(member.id.0),
                EditMember::new().nickname(new_name),
            )
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.ready.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_ids_handle_and_nickname() {
        let member = snapshot(
            UserId::new(42),
            GuildId::new(7),
            "bob",
            Some("[ABC] Bob Smith"),
        );
        assert_eq!(member.id, MemberId(42));
        assert_eq!(member.community, CommunityId(7));
        assert_eq!(member.handle, "bob");
        assert!(member.is_displayed_as("[ABC] Bob Smith"));
    }

    #[test]
    fn snapshot_without_nickname_has_no_display_name() {
        let member = snapshot(UserId::new(42), GuildId::new(7), "bob", None);
        assert_eq!(member.display_name, None);
        assert!(!member.is_displayed_as("bob"));
    }

    #[test]
    fn answered_requests_are_rejections() {
        assert!(matches!(
            classify(Some(403), "Missing Permissions".to_string()),
            PlatformError::Rejected(_)
        ));
        assert!(matches!(
            classify(Some(404), "Unknown Member".to_string()),
            PlatformError::Rejected(_)
        ));
    }

    #[test]
    fn unanswered_requests_are_connection_errors() {
        assert!(matches!(
            classify(None, "timed out".to_string()),
            PlatformError::Connection(_)
        ));
        assert!(matches!(
            platform_error(serenity::Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset
            ))),
            PlatformError::Connection(_)
        ));
    }
}
