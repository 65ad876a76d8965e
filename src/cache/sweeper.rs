//! Periodic cleanup of expired cache entries
//!
//! A sweep is coordinated across processes through `<cache_dir>/.sweep_lock`:
//! - non-blocking exclusive advisory lock; a contended lock is a no-op
//! - the file holds the Unix time of the last sweep; passes closer together
//!   than the interval are skipped. A marker from the future (clock skew
//!   between hosts sharing the directory) does not hold sweeps back
//! - the new marker is written before scanning, so a pass that dies midway
//!   still suppresses retries until the next interval
//! - at most `max_deletions` files are removed per pass
//!
//! Nothing here returns an error to the caller. Every failure is folded
//! into a [`SweepOutcome`].

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;
use super::store::{CacheStore, Slot};
use super::ttl::TtlPolicy;

/// Default minimum spacing between sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default per-pass deletion cap
pub const DEFAULT_MAX_DELETIONS: usize = 200;

/// Counts from a completed sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries examined
    pub scanned: usize,
    /// Expired entries removed
    pub expired_removed: usize,
    /// Unreadable entries removed
    pub corrupt_removed: usize,
    /// The pass stopped at the deletion cap with entries left unvisited
    pub capped: bool,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired_removed + self.corrupt_removed
    }
}

/// Result of a sweep attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Cache directory or lock file not usable
    Unavailable,
    /// Another process or thread holds the sweep lock
    Contended,
    /// The previous sweep was less than one interval ago
    NotDue,
    Completed(SweepReport),
}

impl SweepOutcome {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            SweepOutcome::Unavailable => "unavailable",
            SweepOutcome::Contended => "contended",
            SweepOutcome::NotDue => "not_due",
            SweepOutcome::Completed(_) => "completed",
        }
    }
}

/// Exclusive hold on the sweep lock file, released on drop
struct SweepLock {
    file: File,
}

impl SweepLock {
    /// Try to take the lock without blocking; `Ok(None)` when contended
    fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        match file.try_lock() {
            Ok(()) => Ok(Some(Self { file })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(e),
        }
    }

    fn last_sweep_at(&mut self) -> Option<i64> {
        let mut contents = String::new();
        self.file.seek(SeekFrom::Start(0)).ok()?;
        self.file.read_to_string(&mut contents).ok()?;
        contents.trim().parse().ok()
    }

    fn record(&mut self, now: i64) -> io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(now.to_string().as_bytes())?;
        self.file.flush()
    }
}

impl Drop for SweepLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(error = %e, "Failed to release sweep lock");
        }
    }
}

/// Lock-protected, rate-limited, bounded expiry sweeper
pub struct CacheSweeper {
    store: CacheStore,
    policy: Arc<TtlPolicy>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    max_deletions: usize,
    passes: AtomicU64,
}

impl CacheSweeper {
    pub fn new(
        store: CacheStore,
        policy: Arc<TtlPolicy>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        max_deletions: usize,
    ) -> Self {
        Self {
            store,
            policy,
            clock,
            interval,
            max_deletions,
            passes: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_deletions(&self) -> usize {
        self.max_deletions
    }

    /// Number of passes this sweeper has started scanning
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Marker of the last sweep attempt by any process, read without locking
    pub fn last_sweep_at(&self) -> Option<i64> {
        std::fs::read_to_string(self.store.lock_path())
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Attempt one sweep pass
    pub fn run(&self) -> SweepOutcome {
        if !self.store.dir().is_dir() {
            return SweepOutcome::Unavailable;
        }

        let mut lock = match SweepLock::try_acquire(&self.store.lock_path()) {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                tracing::trace!("Sweep lock held elsewhere");
                return SweepOutcome::Contended;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sweep lock unavailable");
                return SweepOutcome::Unavailable;
            }
        };

        let now = self.clock.now();
        if let Some(last) = lock.last_sweep_at() {
            let elapsed = now.saturating_sub(last);
            if (0..self.interval.as_secs() as i64).contains(&elapsed) {
                return SweepOutcome::NotDue;
            }
            if elapsed < 0 {
                tracing::debug!(last, now, "Sweep marker is in the future; sweeping anyway");
            }
        }

        if let Err(e) = lock.record(now) {
            tracing::warn!(error = %e, "Failed to record sweep time");
            return SweepOutcome::Unavailable;
        }

        self.passes.fetch_add(1, Ordering::SeqCst);
        let report = self.scan(now);

        tracing::debug!(
            scanned = report.scanned,
            expired_removed = report.expired_removed,
            corrupt_removed = report.corrupt_removed,
            capped = report.capped,
            "Cache sweep completed"
        );

        SweepOutcome::Completed(report)
    }

    fn scan(&self, now: i64) -> SweepReport {
        let mut report = SweepReport::default();

        for key in self.store.list_all() {
            if report.removed() >= self.max_deletions {
                report.capped = true;
                break;
            }
            report.scanned += 1;

            match self.store.inspect(&key) {
                Slot::Absent => {}
                Slot::Corrupt => {
                    if self.store.delete(&key) {
                        report.corrupt_removed += 1;
                    }
                }
                Slot::Present(entry) => {
                    if self.policy.is_expired(&entry, now) && self.store.delete(&key) {
                        report.expired_removed += 1;
                    }
                }
            }
        }

        report
    }
}
