use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sigforge_storage::Database;
use sqlx::Error as SqlxError;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

const BATCH_LIMIT: i64 = 500;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Background worker that drops expired admin sessions and checkpoints the WAL.
#[derive(Clone)]
pub struct MaintenanceWorker {
    database: Database,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    interval: Duration,
}

/// Outcome of one maintenance cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub sessions_deleted: u64,
    pub sweep_busy: bool,
    pub checkpoint_busy: bool,
}

impl MaintenanceWorker {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            clock: Arc::new(Utc::now),
            interval: DEFAULT_INTERVAL,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop().await;
        })
    }

    async fn run_loop(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(report) if report.sweep_busy || report.checkpoint_busy => {
                    warn!(stage = "storage", ?report, "maintenance run deferred work");
                }
                Ok(_) => {}
                Err(err) => error!(stage = "storage", error = %err, "maintenance run failed"),
            }
        }
    }

    /// Executes one maintenance cycle (session sweep + checkpoint).
    pub async fn run_once(&self) -> Result<MaintenanceReport, MaintenanceError> {
        let now = (self.clock)();
        let (sessions_deleted, sweep_busy) = self.sweep_sessions(now).await?;
        info!(
            stage = "storage",
            table = "admin_sessions",
            deleted = sessions_deleted,
            busy = sweep_busy,
            now = %now.to_rfc3339(),
            "expired session sweep completed"
        );

        let checkpoint_busy = self.run_checkpoint().await?;

        Ok(MaintenanceReport {
            sessions_deleted,
            sweep_busy,
            checkpoint_busy,
        })
    }

    async fn sweep_sessions(&self, now: DateTime<Utc>) -> Result<(u64, bool), MaintenanceError> {
        let sessions = self.database.admin_sessions();
        let mut total_deleted = 0u64;

        loop {
            match sessions.delete_expired_batch(now, BATCH_LIMIT).await {
                Ok(0) => break,
                Ok(batch_deleted) => {
                    total_deleted += batch_deleted;
                    counter!("admin_sessions_expired_total").increment(batch_deleted);
                }
                Err(err) if is_sqlite_busy(&err) => {
                    counter!("db_busy_total", "op" => "session_sweep").increment(1);
                    warn!(stage = "storage", error = %err, "session sweep hit busy timeout");
                    return Ok((total_deleted, true));
                }
                Err(err) => return Err(MaintenanceError::SessionSweep { source: err }),
            }
        }

        Ok((total_deleted, false))
    }

    async fn run_checkpoint(&self) -> Result<bool, MaintenanceError> {
        let start = std::time::Instant::now();

        match self.database.wal_checkpoint_truncate().await {
            Ok(stats) => {
                let duration = start.elapsed().as_secs_f64();
                histogram!("db_checkpoint_seconds").record(duration);
                let busy = stats.busy_frames > 0;
                if busy {
                    counter!("db_busy_total", "op" => "checkpoint").increment(1);
                    warn!(
                        stage = "storage",
                        busy_frames = stats.busy_frames,
                        log_frames = stats.log_frames,
                        checkpointed_frames = stats.checkpointed_frames,
                        duration_secs = duration,
                        "WAL checkpoint completed with busy frames"
                    );
                } else {
                    info!(
                        stage = "storage",
                        log_frames = stats.log_frames,
                        checkpointed_frames = stats.checkpointed_frames,
                        duration_secs = duration,
                        "WAL checkpoint completed"
                    );
                }
                Ok(busy)
            }
            Err(err) if is_sqlite_busy(&err) => {
                counter!("db_busy_total", "op" => "checkpoint").increment(1);
                warn!(stage = "storage", error = %err, "WAL checkpoint hit busy timeout");
                Ok(true)
            }
            Err(err) => Err(MaintenanceError::Checkpoint { source: err }),
        }
    }
}

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("failed to delete expired admin sessions")]
    SessionSweep {
        #[source]
        source: SqlxError,
    },
    #[error("failed to run WAL checkpoint")]
    Checkpoint {
        #[source]
        source: SqlxError,
    },
}

fn is_sqlite_busy(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db_err) => matches!(db_err.code().as_deref(), Some("5") | Some("6")),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use sigforge_storage::{AdminSession, NewAdminUser};

    use crate::telemetry;
    use crate::test_support::{TestContext, ADMIN_EMAIL};

    #[tokio::test]
    async fn run_once_removes_only_expired_sessions() {
        telemetry::init_metrics().expect("metrics");
        let context = TestContext::new().await;
        let db = context.database.clone();
        let now = context.now;

        db.admin_users()
            .upsert(&NewAdminUser {
                email: ADMIN_EMAIL,
                password_salt: "00",
                password_hash: "00",
                updated_at: now,
            })
            .await
            .expect("admin");

        for idx in 0..3 {
            db.admin_sessions()
                .insert(&AdminSession {
                    id: format!("stale-{idx}"),
                    admin_email: ADMIN_EMAIL.into(),
                    created_at: now - ChronoDuration::hours(24),
                    expires_at: now - ChronoDuration::minutes(idx + 1),
                })
                .await
                .expect("insert stale");
        }
        db.admin_sessions()
            .insert(&AdminSession {
                id: "live".into(),
                admin_email: ADMIN_EMAIL.into(),
                created_at: now,
                expires_at: now + ChronoDuration::hours(1),
            })
            .await
            .expect("insert live");

        let worker = MaintenanceWorker::new(db.clone()).with_clock(Arc::new(move || now));
        let report = worker.run_once().await.expect("run_once");
        assert_eq!(report.sessions_deleted, 3);
        assert!(!report.sweep_busy);

        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_sessions")
            .fetch_one(db.pool())
            .await
            .expect("count sessions");
        assert_eq!(remaining.0, 1);
        assert!(db
            .admin_sessions()
            .fetch_active("live", now)
            .await
            .expect("fetch")
            .is_some());

        let again = worker.run_once().await.expect("second run");
        assert_eq!(again.sessions_deleted, 0);
    }
}
