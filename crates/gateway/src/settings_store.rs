use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    hookrelay_common::GuildId,
    hookrelay_relay::{Error, GuildSettings, Result, SettingsStore},
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
    tracing::debug,
};

const MEMORY_URL: &str = "sqlite::memory:";

/// Pool options for the in-memory database.
///
/// The database lives only as long as one of its connections, so exactly one
/// connection is kept open and never reaped.
fn memory_pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct SettingsRow {
    config: String,
}

/// SQLite-backed per-guild settings, one JSON row per (scope, guild).
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `path` (created if missing), or an in-memory database when
    /// `None`, and make sure the schema exists.
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        let (url, pool) = match path {
            Some(path) => {
                let url = format!("sqlite:{}?mode=rwc", path.display());
                let pool = SqlitePool::connect(&url).await;
                (url, pool)
            },
            None => (
                MEMORY_URL.to_string(),
                memory_pool_options().connect(MEMORY_URL).await,
            ),
        };
        let pool =
            pool.map_err(|e| Error::external(format!("open settings database {url}"), e))?;
        Self::init(&pool).await?;
        debug!(%url, "settings store ready");
        Ok(Self::new(pool))
    }

    /// Create the `guild_settings` table.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS guild_settings (
                scope      TEXT    NOT NULL,
                guild_id   TEXT    NOT NULL,
                config     TEXT    NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (scope, guild_id)
            )"#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::external("create guild_settings table", e))?;
        Ok(())
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self, scope: &str, guild_id: GuildId) -> Result<GuildSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT config FROM guild_settings WHERE scope = ? AND guild_id = ?",
        )
        .bind(scope)
        .bind(guild_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::external("load guild settings", e))?;

        match row {
            Some(row) => Ok(serde_json::from_str(&row.config)?),
            None => Ok(GuildSettings::default()),
        }
    }

    async fn save(&self, scope: &str, guild_id: GuildId, settings: &GuildSettings) -> Result<()> {
        let config_json = serde_json::to_string(settings)?;
        sqlx::query(
            r#"INSERT INTO guild_settings (scope, guild_id, config, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(scope, guild_id) DO UPDATE SET
                 config = excluded.config,
                 updated_at = excluded.updated_at"#,
        )
        .bind(scope)
        .bind(guild_id.to_string())
        .bind(&config_json)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::external("save guild settings", e))?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use {hookrelay_common::UserId, secrecy::Secret};

    use super::*;

    async fn test_store() -> SqliteSettingsStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteSettingsStore::init(&pool).await.unwrap();
        SqliteSettingsStore::new(pool)
    }

    #[tokio::test]
    async fn missing_row_loads_defaults() {
        let store = test_store().await;
        let got = store.load("ifttt", GuildId(1)).await.unwrap();
        assert!(got.destination().is_none());
        assert_eq!(got.rate_limit_seconds, 30);
        assert!(got.enabled);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let store = test_store().await;
        let mut settings = GuildSettings {
            destination_url: Some("https://ntfy.sh/chat".into()),
            auth_token: Some(Secret::new("tk_abc".into())),
            rate_limit_seconds: 60,
            allowed_bot_id: Some(UserId(42)),
            ..GuildSettings::default()
        };
        settings.headers.insert("Title".into(), "Chat".into());
        store.save("ntfy", GuildId(1), &settings).await.unwrap();

        let got = store.load("ntfy", GuildId(1)).await.unwrap();
        assert_eq!(got.destination(), Some("https://ntfy.sh/chat"));
        assert_eq!(got.bearer_token(), Some("tk_abc"));
        assert_eq!(got.rate_limit_seconds, 60);
        assert_eq!(got.allowed_bot_id, Some(UserId(42)));
        assert_eq!(got.headers["Title"], "Chat");
    }

    #[tokio::test]
    async fn save_updates_existing() {
        let store = test_store().await;
        let mut settings = GuildSettings::default();
        store.save("ifttt", GuildId(1), &settings).await.unwrap();

        settings.enabled = false;
        store.save("ifttt", GuildId(1), &settings).await.unwrap();

        assert!(!store.load("ifttt", GuildId(1)).await.unwrap().enabled);
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM guild_settings")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn scopes_and_guilds_are_isolated() {
        let store = test_store().await;
        let settings = GuildSettings {
            destination_url: Some("https://maker.ifttt.com/trigger/a/with/key/b".into()),
            ..GuildSettings::default()
        };
        store.save("ifttt", GuildId(1), &settings).await.unwrap();

        assert!(store.load("ntfy", GuildId(1)).await.unwrap().destination().is_none());
        assert!(store.load("ifttt", GuildId(2)).await.unwrap().destination().is_none());
    }

    #[tokio::test]
    async fn memory_database_survives_idle_reaping() {
        let pool = memory_pool_options()
            .idle_timeout(Duration::from_millis(100))
            .connect(MEMORY_URL)
            .await
            .unwrap();
        SqliteSettingsStore::init(&pool).await.unwrap();
        let store = SqliteSettingsStore::new(pool);

        let settings = GuildSettings {
            rate_limit_seconds: 99,
            ..GuildSettings::default()
        };
        store.save("ifttt", GuildId(3), &settings).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let got = store.load("ifttt", GuildId(3)).await.unwrap();
        assert_eq!(got.rate_limit_seconds, 99);
    }

    #[tokio::test]
    async fn open_without_path_is_usable() {
        let store = SqliteSettingsStore::open(None).await.unwrap();
        store
            .save("ntfy", GuildId(4), &GuildSettings::default())
            .await
            .unwrap();
        assert!(store.load("ntfy", GuildId(4)).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");

        let store = SqliteSettingsStore::open(Some(&path)).await.unwrap();
        let settings = GuildSettings {
            rate_limit_seconds: 120,
            ..GuildSettings::default()
        };
        store.save("ifttt", GuildId(9), &settings).await.unwrap();
        store.pool.close().await;

        let reopened = SqliteSettingsStore::open(Some(&path)).await.unwrap();
        assert_eq!(
            reopened.load("ifttt", GuildId(9)).await.unwrap().rate_limit_seconds,
            120
        );
    }
}
