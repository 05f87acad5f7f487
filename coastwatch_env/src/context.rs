//! Core environment context trait for the verification engine.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the verification engine
/// can run in both production (tokio) and simulation (virtual clock)
/// environments.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, system clock
/// - **Simulation**: `SimContext` (in `coastwatch_sim`) - virtual clock
///
/// # Determinism
///
/// For DST, all methods that would normally introduce non-determinism
/// (time, scheduling) are controlled by the implementation.
#[async_trait]
pub trait CoastwatchContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for layer latency measurements.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time for audit timestamps.
    ///
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    ///
    /// In production: `tokio::spawn`
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;

    /// Wall-clock time as Unix milliseconds.
    ///
    /// Convenience for the `processed_at_ms` / `computed_at_ms` audit
    /// fields. Times before the epoch collapse to 0.
    fn unix_time_ms(&self) -> i64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}
