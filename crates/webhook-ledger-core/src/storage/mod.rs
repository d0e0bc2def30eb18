//! Event persistence.
//!
//! A single `webhook_events` table accessed through sea-orm. [`Database`] owns
//! the connection pool; every request works inside a [`Session`], which is one
//! database transaction scoped to the request:
//!
//! ```text
//! session() -> work -> finish(result) -> commit | rollback -> connection released
//! ```
//!
//! A session that is dropped without being finished rolls back.

pub mod webhook_event;
mod webhook_events;

pub use sea_orm::DbErr;
pub use webhook_events::{NewWebhookEvent, WebhookEvents};

use sea_orm::{
    ConnectOptions, ConnectionTrait, DatabaseConnection, DatabaseTransaction, Schema,
    TransactionTrait,
};
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to connect to database {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: DbErr,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Connection string
    pub url: String,

    /// Connections kept open
    pub pool_size: u32,

    /// Connections allowed above `pool_size`
    pub max_overflow: u32,

    /// How long to wait for a free connection
    pub pool_timeout: Duration,

    /// Maximum lifetime of a connection before it is replaced
    pub pool_recycle: Duration,

    /// Test connections before handing them out
    pub pre_ping: bool,

    /// Log SQL statements
    pub echo: bool,
}

impl DatabaseSettings {
    /// Settings for `url` with the default pool shape.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 10,
            max_overflow: 20,
            pool_timeout: Duration::from_secs(30),
            pool_recycle: Duration::from_secs(1800),
            pre_ping: true,
            echo: true,
        }
    }

    /// Upper bound on open connections.
    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow).max(1)
    }

    /// The URL actually handed to the driver.
    ///
    /// PostgreSQL connections are encrypted: `sslmode=require` is added when
    /// the URL does not choose a mode itself. Other schemes pass through.
    pub fn connect_url(&self) -> String {
        let Ok(mut url) = Url::parse(&self.url) else {
            return self.url.clone();
        };

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return self.url.clone();
        }

        if !url.query_pairs().any(|(key, _)| key == "sslmode") {
            url.query_pairs_mut().append_pair("sslmode", "require");
        }
        url.to_string()
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.connect_url());
        options
            .min_connections(self.pool_size.min(self.max_connections()))
            .max_connections(self.max_connections())
            .acquire_timeout(self.pool_timeout)
            .max_lifetime(self.pool_recycle)
            .test_before_acquire(self.pre_ping)
            .sqlx_logging(self.echo);
        options
    }
}

/// Replace the password in a connection string so it can be logged.
pub fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("[REDACTED]")).is_err() {
                return "[REDACTED]".to_string();
            }
            url.to_string()
        }
        Err(_) => "[REDACTED]".to_string(),
    }
}

/// Handle to the event database and its connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Open the connection pool.
    #[instrument(skip(settings), fields(url = %redact_database_url(&settings.url)))]
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StorageError> {
        let conn = sea_orm::Database::connect(settings.connect_options())
            .await
            .map_err(|source| StorageError::Connect {
                url: redact_database_url(&settings.url),
                source,
            })?;

        info!(
            pool_size = settings.pool_size,
            max_connections = settings.max_connections(),
            pre_ping = settings.pre_ping,
            "Connected to event database"
        );
        Ok(Self { conn })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create the `webhook_events` table and its indexes if they are absent.
    ///
    /// Safe to call on every startup.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(webhook_event::Entity);
        table.if_not_exists();
        self.conn.execute(backend.build(&table)).await?;

        for mut index in schema.create_index_from_entity(webhook_event::Entity) {
            index.if_not_exists();
            self.conn.execute(backend.build(&index)).await?;
        }

        info!("Event schema ready");
        Ok(())
    }

    /// Round-trip to the database.
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.conn.ping().await?;
        Ok(())
    }

    /// Begin a request-scoped session.
    pub async fn session(&self) -> Result<Session, StorageError> {
        let txn = self.conn.begin().await?;
        Ok(Session { txn })
    }

    /// The underlying pooled connection, for reads outside a session.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

/// A request-scoped database transaction.
pub struct Session {
    txn: DatabaseTransaction,
}

impl Session {
    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// End the session: commit when `result` is `Ok`, roll back when it is
    /// `Err`. The connection returns to the pool either way.
    ///
    /// A failed commit turns an `Ok` into an `Err`. A failed rollback is
    /// logged and the original error is returned.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DbErr>,
    {
        match result {
            Ok(value) => {
                self.txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.txn.rollback().await {
                    warn!(error = %rollback_err, "Session rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
