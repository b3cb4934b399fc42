//! Per-host persistent state: layer statuses, latency history, and the
//! rate-limiter window.
//!
//! `HostState` is pure data plus derived accessors; all mutation happens
//! in the pipeline, limiter, and timeout modules. One record exists per
//! configured host and survives between runs via [`crate::store`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of remote-command round-trip samples kept per host.
pub const SSH_HISTORY_CAPACITY: usize = 10;

/// Status of a single probe layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    /// The layer confirmed the host reachable.
    Up,
    /// The layer could not reach the host.
    Down,
    /// The layer had nothing to check (no URLs configured).
    Skip,
    /// The layer was gated off by a cheaper signal.
    Skipped,
    /// The per-minute attempt budget was exhausted before the layer ran.
    RateLimited,
    /// The layer cannot run at all (remote-command binary missing).
    Error,
    /// The layer has not run yet.
    Unknown,
}

impl LayerStatus {
    /// Returns `true` for [`LayerStatus::Up`].
    pub fn is_up(self) -> bool {
        self == Self::Up
    }
}

/// Aggregated host status derived from the layer statuses and evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Deep access works and no evidence alerts fired.
    Up,
    /// Reachable, but something needs attention.
    Degraded,
    /// Unreachable on every layer that matters.
    Down,
    /// Never checked.
    Unknown,
}

/// Fixed-capacity ring buffer of remote-command round-trip times.
///
/// Capacity is [`SSH_HISTORY_CAPACITY`]; pushing an eleventh sample evicts
/// the oldest. Serializes as a plain JSON array so the persisted format
/// stays readable; oversized persisted arrays are re-truncated on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct SshHistory {
    samples: VecDeque<f64>,
}

impl SshHistory {
    /// Record one round-trip duration in seconds, evicting the oldest
    /// sample when the buffer is full.
    pub fn push(&mut self, seconds: f64) {
        if self.samples.len() == SSH_HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(seconds);
    }

    /// Mean of the recorded samples, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.samples.len() as f64;
        Some(self.samples.iter().sum::<f64>() / count)
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate the samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

impl From<Vec<f64>> for SshHistory {
    fn from(values: Vec<f64>) -> Self {
        let mut history = Self::default();
        for v in values {
            history.push(v);
        }
        history
    }
}

impl From<SshHistory> for Vec<f64> {
    fn from(history: SshHistory) -> Self {
        history.samples.into_iter().collect()
    }
}

/// Persistent state for one host.
///
/// Loaded at run start (missing hosts get [`HostState::default`]),
/// mutated in place during the run, persisted at run end even when
/// individual probes failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostState {
    /// RFC 3339 timestamp of the last completed check, or empty.
    pub last_check: String,
    /// Recent remote-command round trips in seconds, oldest first.
    /// Populated on every attempt, including timeouts.
    pub recent_ssh_durations: SshHistory,
    /// Minute bucket (`YYYYMMDDHHmm`) the attempt counter belongs to.
    pub rate_window_key: String,
    /// Remote-command attempts issued within the current minute bucket.
    pub attempts_this_window: u32,
    /// Result of the HTTP probe layer.
    pub http_status: LayerStatus,
    /// Result of the TCP probe layer.
    pub tcp_status: LayerStatus,
    /// Result of the remote-command probe layer.
    pub ssh_status: LayerStatus,
    /// Aggregated status; always derived, never set independently.
    pub overall_status: OverallStatus,
    /// Evidence alerts from the last run; replaced, not appended.
    pub alerts: Vec<String>,
    /// Mean of `recent_ssh_durations`, refreshed when the adaptive
    /// timeout is derived.
    pub average_ssh_seconds: f64,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            last_check: String::new(),
            recent_ssh_durations: SshHistory::default(),
            rate_window_key: String::new(),
            attempts_this_window: 0,
            http_status: LayerStatus::Unknown,
            tcp_status: LayerStatus::Unknown,
            ssh_status: LayerStatus::Unknown,
            overall_status: OverallStatus::Unknown,
            alerts: Vec::new(),
            average_ssh_seconds: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_last_ten_in_order() {
        let mut history = SshHistory::default();
        for i in 0..25 {
            history.push(f64::from(i));
        }
        assert_eq!(history.len(), SSH_HISTORY_CAPACITY);
        let samples: Vec<f64> = history.iter().collect();
        let expected: Vec<f64> = (15..25).map(f64::from).collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn history_shorter_than_capacity_keeps_everything() {
        let mut history = SshHistory::default();
        history.push(1.5);
        history.push(2.5);
        assert_eq!(history.len(), 2);
        assert_eq!(history.mean(), Some(2.0));
    }

    #[test]
    fn history_mean_empty_is_none() {
        assert_eq!(SshHistory::default().mean(), None);
    }

    #[test]
    fn oversized_persisted_history_is_truncated_on_load() {
        let raw: Vec<f64> = (0..20).map(f64::from).collect();
        let json = serde_json::to_string(&raw).expect("serialize");
        let history: SshHistory = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(history.len(), SSH_HISTORY_CAPACITY);
        assert_eq!(history.iter().next(), Some(10.0));
    }

    #[test]
    fn host_state_round_trips_through_json() {
        let mut state = HostState {
            last_check: "2026-08-24T10:00:00Z".to_owned(),
            rate_window_key: "202608241000".to_owned(),
            attempts_this_window: 2,
            http_status: LayerStatus::Up,
            tcp_status: LayerStatus::Down,
            ssh_status: LayerStatus::Skipped,
            overall_status: OverallStatus::Degraded,
            alerts: vec!["disk WARNING".to_owned()],
            average_ssh_seconds: 1.2,
            ..HostState::default()
        };
        state.recent_ssh_durations.push(1.1);
        state.recent_ssh_durations.push(1.3);

        let json = serde_json::to_string(&state).expect("serialize");
        let back: HostState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.rate_window_key, "202608241000");
        assert_eq!(back.ssh_status, LayerStatus::Skipped);
        assert_eq!(back.recent_ssh_durations, state.recent_ssh_durations);
    }

    #[test]
    fn unknown_fields_fall_back_to_defaults() {
        let state: HostState = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(state.http_status, LayerStatus::Unknown);
        assert_eq!(state.overall_status, OverallStatus::Unknown);
        assert!(state.recent_ssh_durations.is_empty());
    }
}
