//! Cross-host failure deduction.
//!
//! Correlates the layer statuses of every host checked in one run and
//! ranks probable root causes. Needs at least two hosts; a single host
//! cannot be cross-correlated. Rules never error: a rule whose
//! precondition matches no host simply contributes nothing.

use serde::Serialize;

use crate::evidence::{disk_usage_percent, DISK_WARNING_PERCENT};
use crate::pipeline::HostReport;
use crate::state::LayerStatus;

/// A weighted sub-cause inside a deduction.
#[derive(Debug, Clone, Serialize)]
pub struct WeightedCause {
    /// Sub-cause description.
    pub cause: String,
    /// Likelihood weight in percent.
    pub weight: u8,
}

impl WeightedCause {
    fn new(cause: &str, weight: u8) -> Self {
        Self {
            cause: cause.to_owned(),
            weight,
        }
    }
}

/// A ranked hypothesis about the root cause of an observed failure
/// pattern. Transient, derived from one run.
#[derive(Debug, Clone, Serialize)]
pub struct Deduction {
    /// Probable cause.
    pub cause: String,
    /// Confidence in percent, 0–100.
    pub confidence: u8,
    /// Why the rule fired.
    pub reasoning: String,
    /// Suggested first checks.
    pub fix: String,
    /// Weighted breakdown of likely sub-causes, when the rule has one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weighted_causes: Vec<WeightedCause>,
}

/// Deduce probable root causes from one run's reports.
///
/// Rules are evaluated in fixed order and every matching rule emits a
/// deduction; per-host rules fire independently per offending host. The
/// result is sorted by descending confidence.
pub fn deduce_failure_causes(reports: &[HostReport]) -> Vec<Deduction> {
    let mut deductions = Vec::new();
    if reports.len() < 2 {
        return deductions;
    }

    let tcp_up: Vec<&HostReport> = reports.iter().filter(|r| r.tcp.is_up()).collect();
    let tcp_down: Vec<&HostReport> = reports.iter().filter(|r| !r.tcp.is_up()).collect();
    let ssh_down: Vec<&HostReport> = reports
        .iter()
        .filter(|r| !r.ssh.is_up() && r.ssh != LayerStatus::Skipped)
        .collect();
    let ssh_up: Vec<&HostReport> = reports.iter().filter(|r| r.ssh.is_up()).collect();

    // Rule 1: every host TCP-unreachable points at the observer.
    if tcp_down.len() == reports.len() {
        deductions.push(Deduction {
            cause: "Local network/firewall issue".to_owned(),
            confidence: 90,
            reasoning: format!(
                "All {} hosts TCP unreachable, so the problem is on the observer's side",
                reports.len()
            ),
            fix: "Check: local firewall, VPN connection, network interface, router".to_owned(),
            weighted_causes: Vec::new(),
        });
    } else if !tcp_up.is_empty() && !tcp_down.is_empty() {
        // Rules 2a/2b: a split fleet isolates the fault per host.
        for report in &tcp_down {
            if report.http.is_up() {
                deductions.push(Deduction {
                    cause: format!(
                        "{}: remote-command daemon issue (HTTP works, monitored port unreachable)",
                        report.host
                    ),
                    confidence: 85,
                    reasoning: format!(
                        "{} serves HTTP but its monitored port is unreachable, so the \
                         daemon behind that port is the suspect",
                        report.host
                    ),
                    fix: format!(
                        "Check on {}: daemon connection limits, abuse-prevention bans, \
                         reverse-DNS lookups in the auth path, daemon listening port, \
                         relay vs direct routing",
                        report.host
                    ),
                    weighted_causes: vec![
                        WeightedCause::new("abuse-prevention lockout of the observer's IP", 30),
                        WeightedCause::new("daemon connection-limit exhaustion", 25),
                        WeightedCause::new("reverse-DNS slowness in the auth path", 20),
                        WeightedCause::new("daemon not listening on the monitored port", 15),
                        WeightedCause::new("relay routing instead of a direct path", 10),
                    ],
                });
            } else {
                let peers: Vec<&str> = tcp_up.iter().map(|r| r.host.as_str()).collect();
                deductions.push(Deduction {
                    cause: format!("{}: host-specific network issue", report.host),
                    confidence: 70,
                    reasoning: format!(
                        "{} is unreachable via TCP while {} work fine",
                        report.host,
                        peers.join(", ")
                    ),
                    fix: format!(
                        "Check: {} VPN/overlay status, firewall rules, daemon listening port",
                        report.host
                    ),
                    weighted_causes: Vec::new(),
                });
            }
        }
    }

    // Rule 3: port open but the session cannot complete.
    for report in &ssh_down {
        if report.tcp.is_up() {
            deductions.push(Deduction {
                cause: format!(
                    "{}: authentication/session-layer issue (port open, session fails)",
                    report.host
                ),
                confidence: 75,
                reasoning: format!(
                    "{} accepts TCP on the monitored port but the remote session cannot complete",
                    report.host
                ),
                fix: format!(
                    "Check on {}: key file permissions, auth-backend reachability, disk \
                     space, I/O wait",
                    report.host
                ),
                weighted_causes: vec![
                    WeightedCause::new("disk exhaustion causing I/O stalls", 35),
                    WeightedCause::new("external auth-backend timeout", 25),
                    WeightedCause::new("load or swap pressure", 20),
                    WeightedCause::new("key mismatch", 10),
                    WeightedCause::new("connection-rate limiting", 10),
                ],
            });
        }
    }

    // Rule 4: a working session with disk pressure explains slowness.
    for report in &ssh_up {
        let Some(disk) = report.evidence.as_ref().and_then(|e| e.disk.as_deref()) else {
            continue;
        };
        if let Some(usage) = disk_usage_percent(disk) {
            if usage > DISK_WARNING_PERCENT {
                let over = usage.saturating_sub(DISK_WARNING_PERCENT).min(30);
                #[allow(clippy::cast_possible_truncation)]
                let confidence = 60u32.saturating_add(over) as u8;
                deductions.push(Deduction {
                    cause: format!(
                        "{}: high disk usage ({usage}%) causing slowness",
                        report.host
                    ),
                    confidence,
                    reasoning: format!(
                        "Disk at {usage}% slows journal and log writes and invites swap"
                    ),
                    fix: "Clean up: container image prune, log rotation, old backups".to_owned(),
                    weighted_causes: Vec::new(),
                });
            }
        }
    }

    deductions.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    deductions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::OverallStatus;

    fn report(host: &str, http: LayerStatus, tcp: LayerStatus, ssh: LayerStatus) -> HostReport {
        HostReport {
            host: host.to_owned(),
            name: String::new(),
            overall: OverallStatus::Unknown,
            http,
            tcp,
            ssh,
            ssh_seconds: 0.0,
            evidence: None,
            alerts: Vec::new(),
        }
    }

    #[test]
    fn single_host_runs_produce_nothing() {
        let reports = vec![report(
            "s60",
            LayerStatus::Down,
            LayerStatus::Down,
            LayerStatus::Down,
        )];
        assert!(deduce_failure_causes(&reports).is_empty());
    }

    #[test]
    fn all_tcp_down_points_at_the_observer() {
        let reports = vec![
            report("s60", LayerStatus::Skip, LayerStatus::Down, LayerStatus::Skipped),
            report("s61", LayerStatus::Down, LayerStatus::Down, LayerStatus::Down),
            report("s62", LayerStatus::Down, LayerStatus::Down, LayerStatus::Down),
        ];
        let deductions = deduce_failure_causes(&reports);
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].confidence, 90);
        assert!(deductions[0].cause.contains("Local network"));
    }

    #[test]
    fn split_with_http_up_blames_the_daemon() {
        let reports = vec![
            report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up),
            report("b", LayerStatus::Up, LayerStatus::Down, LayerStatus::Skipped),
        ];
        let deductions = deduce_failure_causes(&reports);
        assert_eq!(deductions.len(), 1);
        let d = &deductions[0];
        assert_eq!(d.confidence, 85);
        assert!(d.cause.starts_with("b:"));
        assert_eq!(d.weighted_causes.len(), 5);
        assert_eq!(d.weighted_causes[0].weight, 30);
        let total: u32 = d.weighted_causes.iter().map(|w| u32::from(w.weight)).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn split_with_http_down_is_host_specific() {
        let reports = vec![
            report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up),
            report("b", LayerStatus::Down, LayerStatus::Down, LayerStatus::Down),
        ];
        let deductions = deduce_failure_causes(&reports);
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].confidence, 70);
        assert!(deductions[0].cause.contains("host-specific network issue"));
    }

    #[test]
    fn open_port_with_failing_session_is_auth_layer() {
        let reports = vec![
            report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up),
            report("b", LayerStatus::Skip, LayerStatus::Up, LayerStatus::Down),
        ];
        let deductions = deduce_failure_causes(&reports);
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].confidence, 75);
        assert_eq!(deductions[0].weighted_causes[0].weight, 35);
    }

    #[test]
    fn skipped_session_never_counts_as_failed() {
        let reports = vec![
            report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Skipped),
            report("b", LayerStatus::Up, LayerStatus::Up, LayerStatus::Skipped),
        ];
        assert!(deduce_failure_causes(&reports).is_empty());
    }

    #[test]
    fn disk_pressure_scales_confidence() {
        let mut healthy = report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up);
        healthy.evidence = Some(crate::evidence::Evidence {
            disk: Some("/dev/sda1 39G 23G 15G 60% /".to_owned()),
            ..Default::default()
        });
        let mut pressured = report("b", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up);
        pressured.evidence = Some(crate::evidence::Evidence {
            disk: Some("/dev/sda1 39G 37G 2G 95% /".to_owned()),
            ..Default::default()
        });

        let deductions = deduce_failure_causes(&[healthy, pressured]);
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].confidence, 75);
        assert!(deductions[0].cause.starts_with("b:"));
    }

    #[test]
    fn full_disk_yields_eighty_confidence() {
        let mut a = report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up);
        a.evidence = Some(crate::evidence::Evidence {
            disk: Some("/dev/sda1 39G 39G 0G 100% /".to_owned()),
            ..Default::default()
        });
        let b = report("b", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up);

        let deductions = deduce_failure_causes(&[a, b]);
        assert_eq!(deductions[0].confidence, 80);
    }

    #[test]
    fn multiple_rules_sort_by_confidence() {
        // b: TCP down with HTTP up (rule 2a, 85).
        // c: TCP up, session down (rule 3, 75).
        let reports = vec![
            report("a", LayerStatus::Up, LayerStatus::Up, LayerStatus::Up),
            report("b", LayerStatus::Up, LayerStatus::Down, LayerStatus::Skipped),
            report("c", LayerStatus::Skip, LayerStatus::Up, LayerStatus::Down),
        ];
        let deductions = deduce_failure_causes(&reports);
        assert_eq!(deductions.len(), 2);
        assert_eq!(deductions[0].confidence, 85);
        assert_eq!(deductions[1].confidence, 75);
    }
}
