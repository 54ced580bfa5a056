//! Age-based eviction.
//!
//! Each current-generation bucket with a policy is scanned entry by entry.
//! An entry whose `sw-cache-date` is older than the bucket's max age is
//! deleted, unless it was overwritten after the scan read it. Entries
//! without a parseable stamp are never aged out. After the age pass the
//! bucket is trimmed to its max entries, oldest writes first.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use stratus_core::{CacheDb, CachePolicy, CacheSettings, Error, now_ms};
use tokio::task::JoinHandle;

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries read during the age pass.
    pub scanned: u64,
    /// Entries deleted for exceeding the bucket's max age.
    pub expired: u64,
    /// Entries deleted to bring a bucket under its max entries.
    pub trimmed: u64,
    /// Per-entry or per-bucket operations that failed and were skipped.
    pub failed: u64,
}

#[derive(Clone)]
pub struct Sweeper {
    db: CacheDb,
    settings: Arc<CacheSettings>,
}

impl Sweeper {
    pub fn new(db: CacheDb, settings: Arc<CacheSettings>) -> Self {
        Self { db, settings }
    }

    pub async fn sweep(&self) -> Result<SweepReport, Error> {
        self.sweep_at(now_ms()).await
    }

    /// Sweep as if the current time were `now_ms`.
    ///
    /// # Errors
    ///
    /// Only failing to enumerate buckets aborts the sweep; everything past
    /// that is counted in [`SweepReport::failed`].
    pub async fn sweep_at(&self, now_ms: i64) -> Result<SweepReport, Error> {
        let mut report = SweepReport::default();

        for name in self.db.bucket_names().await? {
            let Some(kind) = self.settings.generation.kind_of(&name) else {
                continue;
            };
            let Some(policy) = self.settings.policy(kind).copied() else {
                continue;
            };
            self.sweep_bucket(&name, &policy, now_ms, &mut report).await;
        }

        tracing::info!(
            scanned = report.scanned,
            expired = report.expired,
            trimmed = report.trimmed,
            failed = report.failed,
            "sweep finished"
        );
        Ok(report)
    }

    async fn sweep_bucket(&self, bucket: &str, policy: &CachePolicy, now_ms: i64, report: &mut SweepReport) {
        let keys = match self.db.entry_keys(bucket).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(bucket, error = %e, "failed to list entries");
                report.failed += 1;
                return;
            }
        };

        for key in keys {
            let entry = match self.db.read_entry(bucket, &key).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(bucket, url = %key.url, error = %e, "failed to read entry");
                    report.failed += 1;
                    continue;
                }
            };
            report.scanned += 1;

            let Some(stamp) = entry.response.cache_date() else {
                continue;
            };
            if !policy.is_expired(stamp, now_ms) {
                continue;
            }

            match self.db.delete_entry_if_stamped(bucket, &key, stamp).await {
                Ok(true) => {
                    let age_ms = now_ms.saturating_sub(stamp);
                    tracing::debug!(bucket, url = %key.url, age_ms, "deleted expired entry");
                    report.expired += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(bucket, url = %key.url, error = %e, "failed to delete expired entry");
                    report.failed += 1;
                }
            }
        }

        match self.db.trim_bucket(bucket, policy.max_entries).await {
            Ok(trimmed) => report.trimmed += trimmed,
            Err(e) => {
                tracing::warn!(bucket, error = %e, "failed to trim bucket");
                report.failed += 1;
            }
        }
    }
}

/// Run [`Sweeper::sweep`] every `interval`, skipping the immediate first tick.
pub fn spawn_periodic(sweeper: Sweeper, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.sweep().await {
                tracing::warn!(error = %e, "periodic sweep failed");
            }
        }
    })
}
