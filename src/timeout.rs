//! Adaptive probe timeout derived from recent latency history.

use crate::state::HostState;

/// Timeout used when a host has no recorded latency history.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Floor for adaptive timeouts, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 5;

/// Multiplier applied to the historical average round trip.
pub const ADAPTIVE_TIMEOUT_FACTOR: f64 = 2.0;

/// Derive the probe timeout for one host from its latency history.
///
/// Non-empty history: `max(5, round(mean * 2.0))`, also refreshing
/// `state.average_ssh_seconds`. Empty history: [`DEFAULT_TIMEOUT_SECS`].
///
/// The returned value bounds both the TCP layer and the remote-command
/// layer for the same run, so a historically slow host gets more patience
/// everywhere, not just on the expensive probe.
pub fn compute_timeout(state: &mut HostState) -> u64 {
    match state.recent_ssh_durations.mean() {
        Some(avg) => {
            state.average_ssh_seconds = avg;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let scaled = (avg * ADAPTIVE_TIMEOUT_FACTOR).round() as u64;
            scaled.max(MIN_TIMEOUT_SECS)
        }
        None => DEFAULT_TIMEOUT_SECS,
    }
}
