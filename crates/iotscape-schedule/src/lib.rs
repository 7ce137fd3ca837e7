//! Re-announce scheduler for IoTScape services.
//!
//! Each service tells the server about itself by announcing its
//! definition. Announces are fire-and-forget, so the only way the server
//! re-learns a device after a restart or a lost datagram is that the
//! device keeps announcing. [`AnnounceScheduler`] tracks when a service
//! last announced and says when the next one is due.
//!
//! The scheduler never sleeps. The engine asks [`AnnounceScheduler::is_due`]
//! once per pump with the current instant:
//!
//! ```ignore
//! let now = Instant::now();
//! if scheduler.is_due(now) {
//!     transport.send(definition.as_bytes())?;
//!     scheduler.record_announce(now);
//! }
//! ```
//!
//! Instants are [`tokio::time::Instant`] so tests can drive the clock with
//! `tokio::time::pause()` / `advance()`.

use std::time::Duration;

use tracing::{debug, trace, warn};

pub use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the announce scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceConfig {
    /// Time between announces. A service re-announces once strictly more
    /// than this has elapsed since its last announce. Default: 60 s.
    pub interval: Duration,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl AnnounceConfig {
    /// Default re-announce interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

    /// Shortest interval accepted. Anything lower would flood the server.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a config with a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`AnnounceScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "announce interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Tracks the last announce of one service.
///
/// ## How it's used
///
/// Every service owns one scheduler. On each pump the engine asks every
/// registered service `is_due(now)`; for each one that answers yes it
/// sends the definition and calls `record_announce(now)`. A pump therefore
/// sends at most one announce per service, however long the device was
/// stalled: missed intervals are not replayed.
///
/// ## Why `Option<Instant>`
///
/// `None` means "never announced". A service that got its device ID
/// without announcing (see `create_id` on the engine) must reach the
/// server as soon as possible, so it is due on the very next pump instead
/// of one interval later.
#[derive(Debug, Clone)]
pub struct AnnounceScheduler {
    config: AnnounceConfig,
    last_announce: Option<Instant>,
    announce_count: u64,
}

impl AnnounceScheduler {
    /// Create a scheduler that has never announced.
    pub fn new(config: AnnounceConfig) -> Self {
        let config = config.validated();
        debug!(interval_s = config.interval.as_secs_f64(), "announce scheduler created");
        Self {
            config,
            last_announce: None,
            announce_count: 0,
        }
    }

    /// Create a scheduler for a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(AnnounceConfig::with_interval(interval))
    }

    /// Whether an announce is due at `now`.
    ///
    /// A scheduler that has never announced is always due. Otherwise the
    /// comparison is strict: with a 60 s interval, a pump exactly 60 s
    /// after the last announce does nothing and the next one after that
    /// fires. `saturating_duration_since` keeps a `now` earlier than the
    /// last announce (a caller passing stale instants) from panicking.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_announce {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.config.interval,
        }
    }

    /// Record that an announce went out at `now`.
    pub fn record_announce(&mut self, now: Instant) {
        self.last_announce = Some(now);
        self.announce_count += 1;
        trace!(count = self.announce_count, "announce recorded");
    }

    /// Time left until the next announce is due. Zero if already due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_announce {
            None => Duration::ZERO,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                self.config.interval.saturating_sub(elapsed)
            }
        }
    }

    /// Replace the configuration, keeping the announce history.
    pub fn reconfigure(&mut self, config: AnnounceConfig) {
        self.config = config.validated();
    }

    /// When the last announce went out, if ever.
    pub fn last_announce(&self) -> Option<Instant> {
        self.last_announce
    }

    /// Total announces recorded.
    pub fn announce_count(&self) -> u64 {
        self.announce_count
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

impl Default for AnnounceScheduler {
    fn default() -> Self {
        Self::new(AnnounceConfig::default())
    }
}
