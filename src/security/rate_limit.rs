//! Attempt-counting rate limiter with temporary blocking.
//!
//! # Responsibilities
//! - Count failed attempts per key (client IP)
//! - Block a key for a fixed duration once `max_attempts` is reached
//! - Expire blocks lazily on the next query
//! - Evict idle, unblocked entries from a background task
//!
//! # Design Decisions
//! - Registry is a `DashMap`; the entry API makes each read-modify-write
//!   atomic per key
//! - Every operation is total: no errors are surfaced to callers
//! - State is per process; multiple instances each keep their own registry
//! - Times use `tokio::time::Instant` so tests can pause the clock

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{CleanupConfig, LimiterConfig};
use crate::observability::metrics;

/// Idle threshold after which an unblocked entry is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Interval between idle-cleanup sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest block a limiter will apply; longer durations are clamped.
pub const MAX_BLOCK_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Longest interval between cleanup sweeps; longer intervals are clamped.
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Per-key failure history.
#[derive(Debug, Clone)]
struct AttemptEntry {
    attempts: u32,
    blocked_until: Option<Instant>,
    last_attempt: Instant,
}

impl AttemptEntry {
    fn new(now: Instant) -> Self {
        Self {
            attempts: 0,
            blocked_until: None,
            last_attempt: now,
        }
    }

    fn is_blocked_at(&self, now: Instant) -> bool {
        matches!(self.blocked_until, Some(until) if until > now)
    }
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttemptOutcome {
    /// Whether this attempt tripped (or re-tripped) the block.
    pub blocked: bool,
    /// Full configured block duration in seconds, present only when blocked.
    /// This is a snapshot taken at trip time, not a countdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u64>,
}

impl AttemptOutcome {
    fn allowed() -> Self {
        Self {
            blocked: false,
            remaining_time: None,
        }
    }

    fn blocked(remaining_secs: u64) -> Self {
        Self {
            blocked: true,
            remaining_time: Some(remaining_secs),
        }
    }
}

/// Point-in-time view of a limiter, for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterSnapshot {
    pub name: String,
    pub max_attempts: u32,
    pub block_duration_secs: u64,
    pub tracked_keys: usize,
    pub blocked_keys: usize,
}

/// Fixed-threshold attempt limiter.
///
/// A key becomes blocked once it accumulates `max_attempts` failures and
/// stays blocked for `block_duration`. Recording another failure while
/// blocked re-arms the block from the current instant.
#[derive(Debug)]
pub struct RateLimiter {
    /// Label used in logs and metrics (e.g. "auth", "api").
    name: String,
    entries: DashMap<String, AttemptEntry>,
    max_attempts: u32,
    block_duration: Duration,
    idle_timeout: Duration,
}

impl RateLimiter {
    /// Create a limiter. `max_attempts` below 1 is treated as 1 and
    /// `block_duration` is capped at [`MAX_BLOCK_DURATION`].
    pub fn new(name: impl Into<String>, max_attempts: u32, block_duration: Duration) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            max_attempts: max_attempts.max(1),
            block_duration: block_duration.min(MAX_BLOCK_DURATION),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Build a limiter from its config section and the shared cleanup settings.
    pub fn from_config(name: impl Into<String>, limiter: &LimiterConfig, cleanup: &CleanupConfig) -> Self {
        Self::new(name, limiter.max_attempts, limiter.block_duration())
            .with_idle_timeout(cleanup.idle_timeout())
    }

    /// Override how long an unblocked entry may sit untouched before eviction.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn block_duration(&self) -> Duration {
        self.block_duration
    }

    /// Check whether `key` is currently blocked.
    ///
    /// An entry whose block has expired is removed here, which also resets
    /// its attempt count.
    pub fn is_blocked(&self, key: &str) -> bool {
        let now = Instant::now();
        let blocked_until = match self.entries.get(key) {
            Some(entry) => entry.blocked_until,
            None => return false,
        };

        match blocked_until {
            Some(until) if until > now => true,
            Some(_) => {
                // Re-check under the shard lock: a concurrent failure may have re-armed it.
                let removed = self
                    .entries
                    .remove_if(key, |_, entry| !entry.is_blocked_at(now) && entry.blocked_until.is_some())
                    .is_some();
                if removed {
                    tracing::debug!(limiter = %self.name, key = %key, "Block expired, entry cleared");
                    metrics::record_tracked_keys(&self.name, self.entries.len());
                }
                false
            }
            None => false,
        }
    }

    /// Record a failed attempt for `key`.
    pub fn record_failed_attempt(&self, key: &str) -> AttemptOutcome {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| AttemptEntry::new(now));

        entry.attempts = entry.attempts.saturating_add(1);
        entry.last_attempt = now;
        let attempts = entry.attempts;

        let outcome = if attempts >= self.max_attempts {
            entry.blocked_until = Some(deadline(now, self.block_duration));
            AttemptOutcome::blocked(ceil_secs(self.block_duration))
        } else {
            AttemptOutcome::allowed()
        };
        drop(entry);

        metrics::record_failed_attempt(&self.name);
        metrics::record_tracked_keys(&self.name, self.entries.len());

        if outcome.blocked {
            tracing::warn!(
                limiter = %self.name,
                key = %key,
                attempts,
                block_secs = self.block_duration.as_secs(),
                "Attempt limit reached, key blocked"
            );
            metrics::record_block(&self.name);
        } else {
            tracing::debug!(
                limiter = %self.name,
                key = %key,
                attempts,
                max_attempts = self.max_attempts,
                "Failed attempt recorded"
            );
        }

        outcome
    }

    /// Forget all history for `key`. No-op when absent.
    pub fn reset(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::debug!(limiter = %self.name, key = %key, "Attempt history reset");
            metrics::record_tracked_keys(&self.name, self.entries.len());
        }
    }

    /// Seconds left on the block for `key`, rounded up.
    ///
    /// `None` when the key has no entry, is not blocked, or the block has
    /// already passed. When `Some`, the value is always at least 1.
    pub fn get_blocked_time(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let until = self.entries.get(key)?.blocked_until?;
        if until <= now {
            return None;
        }
        Some(ceil_secs(until - now))
    }

    /// Remove entries idle for longer than the idle timeout that are not
    /// currently blocked. Returns the number removed.
    pub fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let idle = now.saturating_duration_since(entry.last_attempt) > self.idle_timeout;
            if idle && !entry.is_blocked_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            metrics::record_evicted(&self.name, removed);
        }
        metrics::record_tracked_keys(&self.name, self.entries.len());
        removed
    }

    /// Number of keys with recorded history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        let now = Instant::now();
        let blocked_keys = self
            .entries
            .iter()
            .filter(|r| r.value().is_blocked_at(now))
            .count();

        LimiterSnapshot {
            name: self.name.clone(),
            max_attempts: self.max_attempts,
            block_duration_secs: self.block_duration.as_secs(),
            tracked_keys: self.entries.len(),
            blocked_keys,
        }
    }
}

/// `now + duration`, saturating at the furthest representable block.
fn deadline(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration)
        .or_else(|| now.checked_add(MAX_BLOCK_DURATION))
        .unwrap_or(now)
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

/// Background sweep that evicts idle entries from a set of limiters.
///
/// Limiters never start timers on their own; the host owns this task and
/// stops it through the shutdown broadcast.
pub struct CleanupTask {
    limiters: Vec<Arc<RateLimiter>>,
    interval: Duration,
}

impl CleanupTask {
    /// `interval` is capped at [`MAX_CLEANUP_INTERVAL`]; zero is raised to one second.
    pub fn new(limiters: Vec<Arc<RateLimiter>>, interval: Duration) -> Self {
        let interval = interval.clamp(Duration::from_secs(1), MAX_CLEANUP_INTERVAL);
        Self { limiters, interval }
    }

    /// Spawn the sweep loop onto the current runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> CleanupHandle {
        CleanupHandle {
            handle: tokio::spawn(self.run(shutdown)),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            limiters = self.limiters.len(),
            "Rate limiter cleanup starting"
        );

        let start = deadline(Instant::now(), self.interval);
        let mut ticker = time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limiter cleanup received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn sweep(&self) {
        for limiter in &self.limiters {
            let removed = limiter.purge_idle();
            if removed > 0 {
                tracing::info!(
                    limiter = %limiter.name(),
                    removed,
                    remaining = limiter.len(),
                    "Evicted idle rate limiter entries"
                );
            }
        }
    }
}

/// Owned handle to a running [`CleanupTask`].
#[derive(Debug)]
pub struct CleanupHandle {
    handle: JoinHandle<()>,
}

impl CleanupHandle {
    /// Wait up to `grace` for the task to exit after shutdown was broadcast.
    ///
    /// Returns `true` when the loop returned on its own; otherwise the task
    /// is aborted and `false` is returned.
    pub async fn stop(mut self, grace: Duration) -> bool {
        match time::timeout(grace, &mut self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Rate limiter cleanup task failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Rate limiter cleanup did not stop in time, aborting"
                );
                self.handle.abort();
                false
            }
        }
    }

    /// Cancel the task without waiting for it.
    pub fn abort(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_limiter() -> RateLimiter {
        RateLimiter::new("auth", 3, Duration::from_secs(2 * 60))
    }

    #[test]
    fn test_unknown_key_is_clear() {
        let limiter = auth_limiter();
        assert!(!limiter.is_blocked("ip1"));
        assert_eq!(limiter.get_blocked_time("ip1"), None);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_blocks_on_third_attempt() {
        let limiter = auth_limiter();

        let results: Vec<_> = (0..3).map(|_| limiter.record_failed_attempt("ip1")).collect();
        assert_eq!(
            results,
            vec![
                AttemptOutcome { blocked: false, remaining_time: None },
                AttemptOutcome { blocked: false, remaining_time: None },
                AttemptOutcome { blocked: true, remaining_time: Some(120) },
            ]
        );
        assert!(limiter.is_blocked("ip1"));
    }

    #[test]
    fn test_below_threshold_not_blocked() {
        let limiter = auth_limiter();
        limiter.record_failed_attempt("ip1");
        limiter.record_failed_attempt("ip1");
        assert!(!limiter.is_blocked("ip1"));
        assert_eq!(limiter.get_blocked_time("ip1"), None);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_blocked_time_within_duration() {
        let limiter = auth_limiter();
        for _ in 0..3 {
            limiter.record_failed_attempt("ip1");
        }
        let secs = limiter.get_blocked_time("ip1").unwrap();
        assert!(secs > 0);
        assert!(secs <= 120);
    }

    #[test]
    fn test_reset_clears_history() {
        let limiter = auth_limiter();
        for _ in 0..3 {
            limiter.record_failed_attempt("ip1");
        }
        assert!(limiter.is_blocked("ip1"));

        limiter.reset("ip1");
        assert!(!limiter.is_blocked("ip1"));
        assert_eq!(limiter.record_failed_attempt("ip1"), AttemptOutcome::allowed());

        // Absent key
        limiter.reset("never-seen");
    }

    #[test]
    fn test_single_attempt_limit() {
        let limiter = RateLimiter::new("strict", 1, Duration::from_secs(60));
        let outcome = limiter.record_failed_attempt("ip1");
        assert!(outcome.blocked);
        assert_eq!(outcome.remaining_time, Some(60));

        // Zero is clamped to one.
        let limiter = RateLimiter::new("zero", 0, Duration::from_secs(60));
        assert_eq!(limiter.max_attempts(), 1);
        assert!(limiter.record_failed_attempt("ip1").blocked);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = auth_limiter();
        for key in ["ip1", "ip2", "ip3"] {
            limiter.record_failed_attempt(key);
            limiter.record_failed_attempt(key);
        }
        for key in ["ip1", "ip2", "ip3"] {
            assert!(!limiter.is_blocked(key));
        }

        assert!(limiter.record_failed_attempt("ip1").blocked);
        assert!(limiter.is_blocked("ip1"));
        assert!(!limiter.is_blocked("ip2"));
        assert!(!limiter.is_blocked("ip3"));
        assert_eq!(limiter.get_blocked_time("ip2"), None);
    }

    #[test]
    fn test_hammering_blocked_key_stays_blocked() {
        let limiter = auth_limiter();
        for i in 0..10 {
            let outcome = limiter.record_failed_attempt("ip1");
            if i < 2 {
                assert!(!outcome.blocked, "attempt {} should be allowed", i);
            } else {
                // Each further failure re-arms the block with the full duration.
                assert_eq!(outcome, AttemptOutcome::blocked(120), "attempt {}", i);
                assert!(limiter.is_blocked("ip1"));
            }
        }
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_unknown_key_shares_bucket() {
        let limiter = auth_limiter();
        for _ in 0..3 {
            limiter.record_failed_attempt("unknown");
        }
        assert!(limiter.is_blocked("unknown"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_expires_lazily() {
        let limiter = RateLimiter::new("auth", 3, Duration::from_millis(100));
        for _ in 0..3 {
            limiter.record_failed_attempt("ip1");
        }
        assert!(limiter.is_blocked("ip1"));
        assert_eq!(limiter.get_blocked_time("ip1"), Some(1));

        time::advance(Duration::from_millis(150)).await;

        assert_eq!(limiter.get_blocked_time("ip1"), None);
        // Entry still present until queried.
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.is_blocked("ip1"));
        assert!(limiter.is_empty());

        assert_eq!(limiter.record_failed_attempt("ip1"), AttemptOutcome::allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_time_counts_down() {
        let limiter = auth_limiter();
        for _ in 0..3 {
            limiter.record_failed_attempt("ip1");
        }
        assert_eq!(limiter.get_blocked_time("ip1"), Some(120));

        time::advance(Duration::from_millis(30_500)).await;
        assert_eq!(limiter.get_blocked_time("ip1"), Some(90));

        time::advance(Duration::from_secs(89)).await;
        assert_eq!(limiter.get_blocked_time("ip1"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_blocked_extends_block() {
        let limiter = auth_limiter();
        for _ in 0..3 {
            limiter.record_failed_attempt("ip1");
        }

        time::advance(Duration::from_secs(100)).await;
        assert_eq!(limiter.get_blocked_time("ip1"), Some(20));

        limiter.record_failed_attempt("ip1");
        assert_eq!(limiter.get_blocked_time("ip1"), Some(120));

        time::advance(Duration::from_secs(110)).await;
        assert!(limiter.is_blocked("ip1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_idle_keeps_blocked_and_recent() {
        let limiter = RateLimiter::new("auth", 3, Duration::from_secs(60 * 60))
            .with_idle_timeout(Duration::from_secs(10 * 60));

        limiter.record_failed_attempt("idle");
        for _ in 0..3 {
            limiter.record_failed_attempt("blocked");
        }

        time::advance(Duration::from_secs(9 * 60)).await;
        limiter.record_failed_attempt("recent");
        assert_eq!(limiter.purge_idle(), 0);

        time::advance(Duration::from_secs(2 * 60)).await;
        assert_eq!(limiter.purge_idle(), 1);
        assert_eq!(limiter.len(), 2);
        assert!(limiter.is_blocked("blocked"));

        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.tracked_keys, 2);
        assert_eq!(snapshot.blocked_keys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_idle_drops_expired_block() {
        let limiter = RateLimiter::new("api", 5, Duration::from_secs(60));
        for _ in 0..5 {
            limiter.record_failed_attempt("ip1");
        }

        time::advance(DEFAULT_IDLE_TIMEOUT + Duration::from_secs(1)).await;
        assert_eq!(limiter.purge_idle(), 1);
        assert!(limiter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_and_stops() {
        let limiter = Arc::new(RateLimiter::new("auth", 3, Duration::from_secs(120)));
        limiter.record_failed_attempt("ip1");

        let (tx, rx) = broadcast::channel(1);
        let handle = CleanupTask::new(vec![limiter.clone()], DEFAULT_CLEANUP_INTERVAL).spawn(rx);

        // Sweeps at 5m and 10m leave the entry (not yet idle); 15m evicts it.
        time::sleep(Duration::from_secs(11 * 60)).await;
        assert_eq!(limiter.len(), 1);

        time::sleep(Duration::from_secs(5 * 60)).await;
        assert!(limiter.is_empty());

        tx.send(()).unwrap();
        assert!(handle.stop(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_stop_aborts_without_shutdown() {
        let limiter = Arc::new(auth_limiter());
        let (_tx, rx) = broadcast::channel(1);
        let handle = CleanupTask::new(vec![limiter], DEFAULT_CLEANUP_INTERVAL).spawn(rx);

        assert!(!handle.stop(Duration::from_millis(100)).await);
    }

    #[test]
    fn test_huge_block_duration_is_clamped() {
        let limiter = RateLimiter::new("auth", 1, Duration::MAX);
        assert_eq!(limiter.block_duration(), MAX_BLOCK_DURATION);

        let outcome = limiter.record_failed_attempt("ip1");
        assert_eq!(outcome, AttemptOutcome::blocked(MAX_BLOCK_DURATION.as_secs()));
        assert!(limiter.is_blocked("ip1"));
        assert!(limiter.get_blocked_time("ip1").unwrap() <= MAX_BLOCK_DURATION.as_secs());

        // Re-arming a maximal block stays total too.
        assert!(limiter.record_failed_attempt("ip1").blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_cleanup_interval_runs_and_stops() {
        let limiter = Arc::new(auth_limiter());
        limiter.record_failed_attempt("ip1");

        let (tx, rx) = broadcast::channel(1);
        let handle = CleanupTask::new(vec![limiter.clone()], Duration::MAX).spawn(rx);
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        tx.send(()).unwrap();
        assert!(handle.stop(Duration::from_secs(1)).await);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_not_lost() {
        let limiter = Arc::new(RateLimiter::new("api", 1000, Duration::from_secs(60)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        limiter.record_failed_attempt("shared");
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(!limiter.is_blocked("shared"));
        // 800 recorded; 200 more trip the block exactly at 1000.
        for _ in 0..199 {
            assert!(!limiter.record_failed_attempt("shared").blocked);
        }
        assert!(limiter.record_failed_attempt("shared").blocked);
    }
}
