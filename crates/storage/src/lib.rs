use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use sigforge_core::types::{SignatureForm, SignatureRecord};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for the signature submissions collection.
    pub fn signatures(&self) -> SignatureRepository {
        SignatureRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for admin accounts.
    pub fn admin_users(&self) -> AdminUserRepository {
        AdminUserRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for admin login sessions.
    pub fn admin_sessions(&self) -> AdminSessionRepository {
        AdminSessionRepository {
            pool: self.pool.clone(),
        }
    }

    /// Runs `PRAGMA wal_checkpoint(TRUNCATE)` and reports the frame counts.
    pub async fn wal_checkpoint_truncate(&self) -> Result<CheckpointStats, sqlx::Error> {
        let row = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .fetch_one(&self.pool)
            .await?;
        Ok(CheckpointStats {
            busy_frames: row.try_get::<i64, _>(0)?,
            log_frames: row.try_get::<i64, _>(1)?,
            checkpointed_frames: row.try_get::<i64, _>(2)?,
        })
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Frame counters returned by a WAL checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStats {
    pub busy_frames: i64,
    pub log_frames: i64,
    pub checkpointed_frames: i64,
}

/// Append-only repository for signature submissions.
#[derive(Clone)]
pub struct SignatureRepository {
    pool: SqlitePool,
}

impl SignatureRepository {
    /// Stores a submission and returns the record with its generated identifier.
    pub async fn insert(&self, record: &NewSignature<'_>) -> Result<SignatureRecord, SignatureError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO signatures \
             (id, name, title, phone_number, email, meeting_link, template_html, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&record.form.name)
        .bind(&record.form.title)
        .bind(&record.form.phone_number)
        .bind(&record.form.email)
        .bind(record.form.meeting_link.as_deref())
        .bind(record.template_html)
        .bind(to_rfc3339(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(SignatureRecord {
            id,
            name: record.form.name.clone(),
            title: record.form.title.clone(),
            phone_number: record.form.phone_number.clone(),
            email: record.form.email.clone(),
            meeting_link: record.form.meeting_link.clone(),
            template_html: record.template_html.to_string(),
            created_at: record.created_at,
        })
    }

    /// Lists every submission, newest first. Rows sharing a timestamp are
    /// returned in reverse insertion order.
    pub async fn list_recent(&self) -> Result<Vec<SignatureRecord>, SignatureError> {
        let rows = sqlx::query_as::<_, SignatureRow>(
            r#"
SELECT id,
       name,
       title,
       phone_number,
       email,
       meeting_link,
       template_html,
       created_at
  FROM signatures
 ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SignatureRow::into_domain).collect())
    }

    /// Loads a single submission by identifier.
    pub async fn fetch(&self, id: &str) -> Result<Option<SignatureRecord>, SignatureError> {
        let row = sqlx::query_as::<_, SignatureRow>(
            "SELECT id, name, title, phone_number, email, meeting_link, template_html, created_at \
             FROM signatures WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SignatureRow::into_domain))
    }
}

/// Data required to store a new submission.
pub struct NewSignature<'a> {
    pub form: &'a SignatureForm,
    pub template_html: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SignatureRow {
    id: String,
    name: String,
    title: String,
    phone_number: String,
    email: String,
    meeting_link: Option<String>,
    template_html: String,
    created_at: DateTime<Utc>,
}

impl SignatureRow {
    fn into_domain(self) -> SignatureRecord {
        SignatureRecord {
            id: self.id,
            name: self.name,
            title: self.title,
            phone_number: self.phone_number,
            email: self.email,
            meeting_link: self.meeting_link,
            template_html: self.template_html,
            created_at: self.created_at,
        }
    }
}

/// Errors raised by the signature repository.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for admin accounts.
#[derive(Clone)]
pub struct AdminUserRepository {
    pool: SqlitePool,
}

impl AdminUserRepository {
    /// Creates the account or replaces its password when it already exists.
    pub async fn upsert(&self, user: &NewAdminUser<'_>) -> Result<(), AdminUserError> {
        let now = to_rfc3339(user.updated_at);
        sqlx::query(
            "INSERT INTO admin_users (email, password_salt, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(email) DO UPDATE \
             SET password_salt = excluded.password_salt, \
                 password_hash = excluded.password_hash, \
                 updated_at = excluded.updated_at",
        )
        .bind(user.email.to_lowercase())
        .bind(user.password_salt)
        .bind(user.password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads the stored credentials for an email address, compared case-insensitively.
    pub async fn fetch_credentials(
        &self,
        email: &str,
    ) -> Result<Option<AdminCredentials>, AdminUserError> {
        let row = sqlx::query_as::<_, AdminCredentials>(
            "SELECT email, password_salt, password_hash FROM admin_users WHERE email = ?",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Account payload written by [`AdminUserRepository::upsert`].
pub struct NewAdminUser<'a> {
    pub email: &'a str,
    pub password_salt: &'a str,
    pub password_hash: &'a str,
    pub updated_at: DateTime<Utc>,
}

/// Stored salt and digest for an admin account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminCredentials {
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum AdminUserError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for admin login sessions.
#[derive(Clone)]
pub struct AdminSessionRepository {
    pool: SqlitePool,
}

impl AdminSessionRepository {
    pub async fn insert(&self, session: &AdminSession) -> Result<(), SessionError> {
        sqlx::query(
            "INSERT INTO admin_sessions (id, admin_email, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.admin_email)
        .bind(to_rfc3339(session.created_at))
        .bind(to_rfc3339(session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("787") => {
                SessionError::UnknownAdmin
            }
            other => SessionError::Database(other),
        })?;
        Ok(())
    }

    /// Returns the session when it exists and has not expired at `now`.
    pub async fn fetch_active(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AdminSession>, SessionError> {
        let row = sqlx::query_as::<_, AdminSession>(
            "SELECT id, admin_email, created_at, expires_at FROM admin_sessions \
             WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(to_rfc3339(now))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Removes a session, returning `true` when a row was deleted.
    pub async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes up to `limit` sessions that expired at or before `now`.
    pub async fn delete_expired_batch(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM admin_sessions WHERE id IN \
             (SELECT id FROM admin_sessions WHERE expires_at <= ? LIMIT ?)",
        )
        .bind(to_rfc3339(now))
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// A persisted admin login session.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AdminSession {
    pub id: String,
    pub admin_email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session references an unknown admin account")]
    UnknownAdmin,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
