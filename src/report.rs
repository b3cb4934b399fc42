//! Plain-text rendering of a run report for the terminal.

use std::fmt::Write as _;

use crate::orchestrator::RunReport;
use crate::state::OverallStatus;
use crate::store::StateMap;

/// Render the end-of-run summary: per-host status lines, alerts, and
/// ranked deductions.
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "HEALTH SUMMARY");
    for host in &report.hosts {
        let marker = match host.overall {
            OverallStatus::Up => "ok",
            OverallStatus::Degraded => "warn",
            OverallStatus::Down => "DOWN",
            OverallStatus::Unknown => "?",
        };
        let _ = writeln!(
            out,
            "  [{marker}] {}: {:?} (http={:?} tcp={:?} ssh={:?})",
            host.host, host.overall, host.http, host.tcp, host.ssh
        );
    }

    if report.alerts.is_empty() {
        let _ = writeln!(out, "\nno alerts");
    } else {
        let _ = writeln!(out, "\nALERTS ({}):", report.alerts.len());
        for alert in &report.alerts {
            let _ = writeln!(out, "  {alert}");
        }
    }

    if !report.deductions.is_empty() {
        let _ = writeln!(out, "\nFAILURE DEDUCTION (ranked by confidence)");
        for (i, d) in report.deductions.iter().enumerate() {
            let _ = writeln!(
                out,
                "\n  [{}] {} -- {}% confidence",
                i.saturating_add(1),
                d.cause,
                d.confidence
            );
            let _ = writeln!(out, "      reasoning: {}", d.reasoning);
            let _ = writeln!(out, "      fix: {}", d.fix);
            if !d.weighted_causes.is_empty() {
                let _ = writeln!(out, "      likely root causes:");
                for wc in &d.weighted_causes {
                    let filled = usize::from(wc.weight / 5);
                    let bar: String = "#".repeat(filled);
                    let _ = writeln!(out, "        {bar:<7} {:>3}% {}", wc.weight, wc.cause);
                }
            }
        }
    }

    out
}

/// Render the persisted state without probing (`--status`).
pub fn render_status(states: &StateMap) -> String {
    if states.is_empty() {
        return "no recorded state (run a check first)\n".to_owned();
    }
    let mut out = String::new();
    for (host, state) in states {
        let _ = writeln!(
            out,
            "{host}: {:?} (last={}, avg_ssh={:.1}s)",
            state.overall_status,
            if state.last_check.is_empty() {
                "never"
            } else {
                &state.last_check
            },
            state.average_ssh_seconds
        );
    }
    out
}
