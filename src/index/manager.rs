//! Index manager: owns the event index, runs the periodic maintenance task,
//! and dumps/restores snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::EventIndex;
use crate::metrics;
use crate::snapshot;
use crate::types::unix_now;

/// Counters accumulated by the maintenance loop since process start.
#[derive(Debug, Default)]
struct MaintainStats {
    updates_applied: AtomicU64,
    updates_expired: AtomicU64,
}

struct MaintainHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the event index and its background maintenance.
pub struct IndexManager {
    index: Arc<EventIndex>,
    stats: Arc<MaintainStats>,
    maintain: Mutex<Option<MaintainHandle>>,
}

impl IndexManager {
    /// Create a manager over an empty index.
    #[must_use]
    pub fn new(initial_buckets: usize, max_size: usize) -> Self {
        Self {
            index: Arc::new(EventIndex::new(initial_buckets, max_size)),
            stats: Arc::new(MaintainStats::default()),
            maintain: Mutex::new(None),
        }
    }

    /// Create a manager, restoring from the snapshot at `prefix`. A failed
    /// restore logs a warning and starts empty; the index is never left in a
    /// partial state.
    #[must_use]
    pub fn with_restore(initial_buckets: usize, max_size: usize, prefix: &str) -> Self {
        let manager = Self::new(initial_buckets, max_size);
        match snapshot::read_snapshot(prefix) {
            Ok(snap) => {
                let postings: usize = snap.postings.iter().map(|(_, e)| e.len()).sum();
                manager.index.load_snapshot(snap);
                info!(prefix, postings, "restored index from snapshot");
            }
            Err(e) => {
                warn!(prefix, error = %e, "snapshot restore failed, starting empty");
                return Self::new(initial_buckets, max_size);
            }
        }
        manager
    }

    /// The underlying index, shared with the pipeline and query executor.
    #[must_use]
    pub fn index(&self) -> Arc<EventIndex> {
        self.index.clone()
    }

    /// Spawn the maintenance task: apply every `apply_interval`, prune empty
    /// posting lists every `compaction_interval`.
    pub fn start_maintain(&self, apply_interval: Duration, compaction_interval: Duration) {
        let mut guard = self.maintain.lock().expect("maintain handle lock");
        if guard.is_some() {
            warn!("maintenance task already running");
            return;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let index = self.index.clone();
        let stats = self.stats.clone();
        let task = tokio::spawn(async move {
            maintain_loop(index, stats, apply_interval, compaction_interval, shutdown_rx).await;
        });
        *guard = Some(MaintainHandle {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Signal the maintenance task and wait for it to exit. No-op when not
    /// running.
    pub async fn stop_maintain(&self) {
        let handle = self.maintain.lock().expect("maintain handle lock").take();
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(true);
            if let Err(e) = handle.task.await {
                warn!(error = %e, "maintenance task join failed");
            }
        }
    }

    /// Run one apply immediately, outside the maintenance schedule. Used on
    /// shutdown to publish updates drained after the loop stopped.
    pub fn apply_now(&self) -> (usize, usize) {
        let (applied, expired) = self.index.apply(unix_now());
        self.record_apply(applied, expired);
        (applied, expired)
    }

    /// Quiesce writers and dump a snapshot to `prefix`.
    pub fn dump(&self, prefix: &str) -> Result<()> {
        let snap = self.index.snapshot();
        match snapshot::write_snapshot(prefix, &snap) {
            Ok(()) => {
                metrics::SNAPSHOTS_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    prefix,
                    terms = snap.postings.len(),
                    deadlines = snap.expire.len(),
                    "snapshot dumped"
                );
                Ok(())
            }
            Err(e) => {
                metrics::SNAPSHOTS_TOTAL.with_label_values(&["failure"]).inc();
                Err(e)
            }
        }
    }

    /// Published postings in the index.
    #[must_use]
    pub fn posting_count(&self) -> u64 {
        self.index.store().posting_count()
    }

    /// Tracked deadline pairs.
    #[must_use]
    pub fn expire_table_size(&self) -> usize {
        self.index.expire_table_size()
    }

    /// Edits published since process start.
    #[must_use]
    pub fn updates_applied(&self) -> u64 {
        self.stats.updates_applied.load(Ordering::Relaxed)
    }

    /// Postings evicted by expiration since process start.
    #[must_use]
    pub fn updates_expired(&self) -> u64 {
        self.stats.updates_expired.load(Ordering::Relaxed)
    }

    fn record_apply(&self, applied: usize, expired: usize) {
        record_apply(&self.stats, &self.index, applied, expired);
    }
}

fn record_apply(stats: &MaintainStats, index: &EventIndex, applied: usize, expired: usize) {
    stats
        .updates_applied
        .fetch_add(applied as u64, Ordering::Relaxed);
    stats
        .updates_expired
        .fetch_add(expired as u64, Ordering::Relaxed);
    metrics::UPDATES_APPLIED_TOTAL.inc_by(applied as u64);
    metrics::UPDATES_EXPIRED_TOTAL.inc_by(expired as u64);
    metrics::POSTING_COUNT.set(index.store().posting_count() as i64);
    metrics::EXPIRE_TABLE_SIZE.set(index.expire_table_size() as i64);
}

/// Background maintenance loop: periodic applies plus occasional compaction.
async fn maintain_loop(
    index: Arc<EventIndex>,
    stats: Arc<MaintainStats>,
    apply_interval: Duration,
    compaction_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        apply_interval_secs = apply_interval.as_secs(),
        compaction_interval_secs = compaction_interval.as_secs(),
        "maintenance loop started"
    );

    let compact_every = (compaction_interval.as_secs() / apply_interval.as_secs().max(1)).max(1);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(apply_interval) => {},
            _ = shutdown.changed() => {
                info!("maintenance loop shutting down");
                break;
            }
        }

        let now = unix_now();
        let (applied, expired) = index.apply(now);
        record_apply(&stats, &index, applied, expired);
        metrics::MAINTENANCE_TICKS_TOTAL.inc();
        debug!(applied, expired, "apply tick");

        tick += 1;
        if tick % compact_every == 0 {
            let pruned = index.compact();
            if pruned > 0 {
                debug!(pruned, "pruned empty posting lists");
            }
        }
    }
}
