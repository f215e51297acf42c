//! Identity lookups against the auth database (MySQL).

use async_trait::async_trait;
use nicksync_core::{IdentityRecord, IdentityResolver, MemberId, ResolveError};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::config::Config;

/// Main character ticker and name for a Discord account, at most one row.
const LOOKUP_SQL: &str = r#"
    SELECT eveonline_evecharacter.corporation_ticker,
           eveonline_evecharacter.character_name
    FROM authentication_authservicesinfo
    JOIN eveonline_evecharacter
      ON eveonline_evecharacter.character_id = authentication_authservicesinfo.main_char_id
    WHERE authentication_authservicesinfo.discord_uid = ?
    LIMIT 1
"#;

/// [`IdentityResolver`] backed by a MySQL pool.
#[derive(Clone)]
pub struct MySqlIdentityResolver {
    pool: MySqlPool,
}

impl MySqlIdentityResolver {
    /// Connect to the database named in `config`.
    ///
    /// Connects eagerly so an unreachable database fails at startup.
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let options = MySqlConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_username)
            .password(&config.db_password)
            .database(&config.db_database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(options)
            .await?;

        tracing::info!(
            host = %config.db_host,
            database = %config.db_database,
            "Connected to the database"
        );

        Ok(Self::new(pool))
    }

    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl IdentityResolver for MySqlIdentityResolver {
    async fn resolve(&self, member: MemberId) -> Result<Option<IdentityRecord>, ResolveError> {
        let row = sqlx::query_as::<_, (String, String)>(LOOKUP_SQL)
            .bind(member.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(resolve_error)?;

        Ok(row.map(|(tag, real_name)| IdentityRecord::new(tag, real_name)))
    }
}

fn resolve_error(e: sqlx::Error) -> ResolveError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ResolveError::Connection(e.to_string()),
        other => ResolveError::Query(other.to_string()),
    }
}
