//! Threshold-based analysis of free-text diagnostics collected from a
//! reachable host.

use serde::{Deserialize, Serialize};

/// Sentinel stored when an individual diagnostic failed or timed out.
pub const TIMEOUT_SENTINEL: &str = "timeout";

/// Disk usage above this percentage is critical.
pub const DISK_CRITICAL_PERCENT: u32 = 90;

/// Disk usage above this percentage (and at most critical) is a warning.
pub const DISK_WARNING_PERCENT: u32 = 80;

/// One-minute load average above this value raises a high-load alert.
pub const HIGH_LOAD_THRESHOLD: f64 = 4.0;

/// Raw diagnostic output collected from one host.
///
/// Fields are unset when the rate budget ran out before the command was
/// issued; the [`TIMEOUT_SENTINEL`] marks commands that were issued but
/// did not complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// `uptime` output.
    pub uptime: Option<String>,
    /// Root filesystem usage line (`df -h /`).
    pub disk: Option<String>,
    /// Memory summary line (`free -h`).
    pub memory: Option<String>,
    /// Failed service units (`systemctl --failed`).
    pub failed_units: Option<String>,
    /// Load averages (`/proc/loadavg`).
    pub load: Option<String>,
}

/// Extract the highest percentage token from filesystem-usage text.
///
/// `df` output carries exactly one such token; taking the maximum keeps
/// the parse robust against multi-line input.
pub fn disk_usage_percent(disk_text: &str) -> Option<u32> {
    disk_text
        .split_whitespace()
        .filter_map(|token| token.strip_suffix('%'))
        .filter_map(|token| token.parse::<u32>().ok())
        .max()
}

/// First numeric token of loadavg text.
fn load_1m(load_text: &str) -> Option<f64> {
    load_text.split_whitespace().next()?.parse().ok()
}

/// Turn collected diagnostics into alerts for `host`.
///
/// Pure function: thresholds only, no I/O. Sentinel and empty values
/// contribute nothing.
pub fn analyze(host: &str, evidence: &Evidence) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(disk) = evidence.disk.as_deref() {
        if let Some(usage) = disk_usage_percent(disk) {
            if usage > DISK_CRITICAL_PERCENT {
                alerts.push(format!("{host} disk CRITICAL: {usage}%"));
            } else if usage > DISK_WARNING_PERCENT {
                alerts.push(format!("{host} disk WARNING: {usage}%"));
            }
        }
    }

    if let Some(load) = evidence.load.as_deref() {
        if let Some(load_1m) = load_1m(load) {
            if load_1m > HIGH_LOAD_THRESHOLD {
                alerts.push(format!("{host} high load: {load_1m}"));
            }
        }
    }

    if let Some(failed) = evidence.failed_units.as_deref() {
        let failed = failed.trim();
        if !failed.is_empty() && failed != TIMEOUT_SENTINEL {
            alerts.push(format!("{host} failed services: {failed}"));
        }
    }

    alerts
}
