//! Layered per-host probe pipeline.
//!
//! Strictly sequential stages in cost order: HTTP → TCP → gate → remote
//! command → evidence collection → evidence analysis. Cheap signals gate
//! the expensive layers so the rate budget is spent only where it can
//! change the answer. Network and command failures never abort the
//! pipeline; they become layer statuses plus alerts.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::evidence::{self, Evidence, TIMEOUT_SENTINEL};
use crate::limiter::{self, MAX_ATTEMPTS_PER_MINUTE};
use crate::probe::{
    HttpProbeError, HttpProber, LayerStatus, ProbeOutcome, RemoteExecError, RemoteExecutor,
    TcpProber,
};
use crate::state::{HostState, OverallStatus};
use crate::timeout::compute_timeout;

/// Fixed timeout for the HTTP stage, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Successful HTTP responses slower than this raise an alert, in seconds.
const SLOW_HTTP_SECS: f64 = 5.0;

/// Successful TCP connects slower than this raise an alert, in seconds.
const SLOW_TCP_SECS: f64 = 3.0;

/// Successful remote sessions slower than this raise an alert, in seconds.
const SLOW_SSH_SECS: f64 = 5.0;

/// Marker command run to prove a working remote session.
pub const SENTINEL_COMMAND: &str = "echo ok";

/// Text the sentinel command must print for the session to count.
pub const SENTINEL_TEXT: &str = "ok";

/// Diagnostics collected once a remote session is confirmed, in order.
/// Each issued command consumes rate budget.
pub const DIAGNOSTIC_COMMANDS: &[(&str, &str)] = &[
    ("uptime", "uptime"),
    ("disk", "df -h / | tail -1"),
    ("memory", "free -h | grep Mem"),
    (
        "failed",
        "systemctl --failed --no-pager --no-legend 2>/dev/null | head -5",
    ),
    ("load", "cat /proc/loadavg"),
];

/// Probe implementations injected into the pipeline.
#[derive(Clone)]
pub struct ProbeStack {
    /// HTTP reachability checker.
    pub http: Arc<dyn HttpProber>,
    /// TCP connectivity checker.
    pub tcp: Arc<dyn TcpProber>,
    /// Remote command execution service.
    pub remote: Arc<dyn RemoteExecutor>,
}

/// Result of one host's pipeline run. Transient, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    /// Host identifier.
    pub host: String,
    /// Human-readable role description from configuration.
    pub name: String,
    /// Aggregated status.
    pub overall: OverallStatus,
    /// HTTP layer status.
    pub http: LayerStatus,
    /// TCP layer status.
    pub tcp: LayerStatus,
    /// Remote-command layer status.
    pub ssh: LayerStatus,
    /// Round-trip seconds of the successful remote probe, 0 otherwise.
    pub ssh_seconds: f64,
    /// Collected diagnostics, when the evidence stage ran.
    pub evidence: Option<Evidence>,
    /// Every alert raised for this host during the run (probe layers and
    /// evidence analysis). The persisted state keeps only the evidence
    /// alerts.
    pub alerts: Vec<String>,
}

/// Run the full pipeline for one host, mutating its persistent state.
pub async fn check_host(stack: &ProbeStack, cfg: &HostConfig, state: &mut HostState) -> HostReport {
    let budget_left =
        MAX_ATTEMPTS_PER_MINUTE.saturating_sub(state.attempts_this_window);
    info!(
        host = %cfg.id,
        name = %cfg.name,
        avg_ssh_secs = state.average_ssh_seconds,
        budget_left,
        "checking host"
    );

    let mut alerts = Vec::new();

    // Stage 1: HTTP, cheapest signal.
    let http = check_http(stack.http.as_ref(), cfg).await;
    state.http_status = http.status;
    alerts.extend(http.alerts.iter().cloned());
    info!(host = %cfg.id, status = ?http.status, "http stage");

    // Stage 2: TCP, bounded by the adaptive timeout.
    let tcp_timeout = compute_timeout(state);
    let tcp = check_tcp(stack.tcp.as_ref(), cfg, tcp_timeout).await;
    state.tcp_status = tcp.status;
    alerts.extend(tcp.alerts.iter().cloned());
    info!(host = %cfg.id, status = ?tcp.status, timeout_secs = tcp_timeout, "tcp stage");

    // Stage 3: gate. A host fully up via HTTP with its monitored port
    // closed already signals a target-specific issue worth the deeper
    // probe; a host fully up via HTTP and TCP-unconfirmed does not.
    let ssh = if tcp.status.is_up() || state.http_status == LayerStatus::Down {
        let outcome = check_remote(stack.remote.as_ref(), cfg, state).await;
        info!(host = %cfg.id, status = ?outcome.status, seconds = outcome.duration_seconds, "remote stage");
        outcome
    } else {
        debug!(host = %cfg.id, "remote stage gated off");
        ProbeOutcome::status_only(LayerStatus::Skipped)
    };
    state.ssh_status = ssh.status;
    alerts.extend(ssh.alerts.iter().cloned());

    // Stage 4: evidence, only over a confirmed session.
    let collected = if state.ssh_status.is_up() {
        Some(collect_evidence(stack.remote.as_ref(), cfg, state).await)
    } else {
        None
    };

    // Stage 5: analysis. Only evidence alerts persist on the state.
    let evidence_alerts = collected
        .as_ref()
        .map(|e| evidence::analyze(&cfg.id, e))
        .unwrap_or_default();
    state.overall_status =
        overall_status(state.ssh_status, state.http_status, evidence_alerts.len());
    state.alerts = evidence_alerts.clone();
    alerts.extend(evidence_alerts);

    HostReport {
        host: cfg.id.clone(),
        name: cfg.name.clone(),
        overall: state.overall_status,
        http: state.http_status,
        tcp: state.tcp_status,
        ssh: state.ssh_status,
        ssh_seconds: ssh.duration_seconds,
        evidence: collected,
        alerts,
    }
}

/// Reduce layer statuses and the evidence alert count to one host status.
///
/// Pure function; `overall_status` on the state is never set any other
/// way.
pub fn overall_status(
    ssh: LayerStatus,
    http: LayerStatus,
    evidence_alert_count: usize,
) -> OverallStatus {
    if ssh.is_up() {
        if evidence_alert_count == 0 {
            OverallStatus::Up
        } else {
            OverallStatus::Degraded
        }
    } else if http.is_up() {
        // The service facade answers even though deep access does not.
        OverallStatus::Degraded
    } else {
        OverallStatus::Down
    }
}

/// HTTP stage: HEAD every configured URL under a fixed timeout.
async fn check_http(prober: &dyn HttpProber, cfg: &HostConfig) -> ProbeOutcome {
    if cfg.http_urls.is_empty() {
        return ProbeOutcome::status_only(LayerStatus::Skip);
    }

    let timeout = Duration::from_secs(HTTP_TIMEOUT_SECS);
    let mut alerts = Vec::new();
    let mut any_up = false;
    let mut best = 0.0_f64;

    for url in &cfg.http_urls {
        match prober.probe(url, timeout).await {
            Ok(probe) if probe.status_code == 200 => {
                let elapsed = probe.elapsed.as_secs_f64();
                any_up = true;
                if best == 0.0 || elapsed < best {
                    best = elapsed;
                }
                if elapsed > SLOW_HTTP_SECS {
                    alerts.push(format!("{url} slow ({elapsed:.1}s)"));
                }
            }
            Ok(probe) => {
                alerts.push(format!("{url} returned HTTP {}", probe.status_code));
            }
            Err(HttpProbeError::Tls(detail)) => {
                // Something completed a handshake attempt; the host is
                // answering even though the certificate is broken.
                any_up = true;
                alerts.push(format!("{url} TLS certificate error: {detail}"));
            }
            Err(HttpProbeError::Network(detail)) => {
                alerts.push(format!("{url} down: {detail}"));
            }
        }
    }

    ProbeOutcome {
        status: if any_up {
            LayerStatus::Up
        } else {
            LayerStatus::Down
        },
        alerts,
        duration_seconds: best,
    }
}

/// TCP stage: one connect attempt per target under the adaptive timeout.
async fn check_tcp(prober: &dyn TcpProber, cfg: &HostConfig, timeout_secs: u64) -> ProbeOutcome {
    let timeout = Duration::from_secs(timeout_secs);
    let mut alerts = Vec::new();
    let mut any_up = false;
    let mut best = 0.0_f64;

    for target in &cfg.tcp_checks {
        match prober.connect(&target.address, target.port, timeout).await {
            Some(elapsed) => {
                let elapsed = elapsed.as_secs_f64();
                any_up = true;
                if best == 0.0 || elapsed < best {
                    best = elapsed;
                }
                if elapsed > SLOW_TCP_SECS {
                    alerts.push(format!(
                        "{}:{} slow TCP ({elapsed:.1}s)",
                        target.address, target.port
                    ));
                }
            }
            None => {
                alerts.push(format!(
                    "{}:{} TCP unreachable (timeout={timeout_secs}s)",
                    target.address, target.port
                ));
            }
        }
    }

    ProbeOutcome {
        status: if any_up {
            LayerStatus::Up
        } else {
            LayerStatus::Down
        },
        alerts,
        duration_seconds: best,
    }
}

/// Remote-command stage: walk the alias fallback chain under the rate
/// limiter and the adaptive timeout.
async fn check_remote(
    remote: &dyn RemoteExecutor,
    cfg: &HostConfig,
    state: &mut HostState,
) -> ProbeOutcome {
    if !limiter::can_probe(state) {
        return ProbeOutcome {
            status: LayerStatus::RateLimited,
            alerts: vec![format!(
                "{} remote probe rate limited ({MAX_ATTEMPTS_PER_MINUTE}/min)",
                cfg.id
            )],
            duration_seconds: 0.0,
        };
    }

    let timeout_secs = compute_timeout(state);
    let mut alerts = Vec::new();

    for alias in &cfg.ssh_aliases {
        limiter::record_attempt(state);
        match remote.execute(alias, SENTINEL_COMMAND, timeout_secs).await {
            Ok(output) => {
                let elapsed = output.duration.as_secs_f64();
                // Every completed attempt teaches the timeout calculator,
                // successful or not.
                state.recent_ssh_durations.push(round2(elapsed));

                if output.success() && output.stdout.contains(SENTINEL_TEXT) {
                    if elapsed > SLOW_SSH_SECS {
                        alerts.push(format!("{} slow session via {alias} ({elapsed:.1}s)", cfg.id));
                    }
                    return ProbeOutcome {
                        status: LayerStatus::Up,
                        alerts,
                        duration_seconds: elapsed,
                    };
                }
                debug!(
                    host = %cfg.id,
                    alias = %alias,
                    exit_code = ?output.exit_code,
                    "sentinel command failed, trying next alias"
                );
            }
            Err(RemoteExecError::Timeout { seconds, elapsed }) => {
                state.recent_ssh_durations.push(round2(elapsed.as_secs_f64()));
                alerts.push(format!("{} remote timeout via {alias} ({seconds}s)", cfg.id));
            }
            Err(RemoteExecError::BinaryMissing(binary)) => {
                // Non-retryable: no alias can work without the client.
                alerts.push(format!("remote command binary '{binary}' not found"));
                return ProbeOutcome {
                    status: LayerStatus::Error,
                    alerts,
                    duration_seconds: 0.0,
                };
            }
            Err(RemoteExecError::Spawn(detail)) => {
                alerts.push(format!("{} remote exec failed via {alias}: {detail}", cfg.id));
            }
        }
    }

    ProbeOutcome {
        status: LayerStatus::Down,
        alerts,
        duration_seconds: 0.0,
    }
}

/// Evidence stage: fixed diagnostics over the preferred route, stopping
/// as soon as the rate budget runs out.
async fn collect_evidence(
    remote: &dyn RemoteExecutor,
    cfg: &HostConfig,
    state: &mut HostState,
) -> Evidence {
    let mut collected = Evidence::default();
    let Some(alias) = cfg.ssh_aliases.first() else {
        return collected;
    };
    let timeout_secs = compute_timeout(state);

    for (key, command) in DIAGNOSTIC_COMMANDS {
        if !limiter::can_probe(state) {
            debug!(host = %cfg.id, stopped_before = key, "evidence budget exhausted");
            break;
        }
        limiter::record_attempt(state);

        let value = match remote.execute(alias, command, timeout_secs).await {
            Ok(output) => output.stdout.trim().to_owned(),
            Err(e) => {
                debug!(host = %cfg.id, diagnostic = key, error = %e, "diagnostic failed");
                TIMEOUT_SENTINEL.to_owned()
            }
        };

        match *key {
            "uptime" => collected.uptime = Some(value),
            "disk" => collected.disk = Some(value),
            "memory" => collected.memory = Some(value),
            "failed" => collected.failed_units = Some(value),
            "load" => collected.load = Some(value),
            _ => {}
        }
    }

    collected
}

/// Round to two decimals, matching the persisted history precision.
fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
