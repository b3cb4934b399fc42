//! Run orchestration: sequence the pipeline over the selected hosts,
//! persist state, and feed the aggregated results to the deduction
//! engine.
//!
//! Hosts are processed strictly sequentially; the state store is
//! exclusively owned here for the duration of one run. A run either
//! completes (persisting final state) or is interrupted, in which case
//! the in-flight host's state is unreliable until the next run.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::FleetConfig;
use crate::deduce::{deduce_failure_causes, Deduction};
use crate::pipeline::{check_host, HostReport, ProbeStack};
use crate::store::StateStore;

/// Aggregated result of one monitoring run. Transient, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Per-host results, in the order the hosts were checked.
    pub hosts: Vec<HostReport>,
    /// Every alert raised during the run, across all hosts.
    pub alerts: Vec<String>,
    /// Ranked root-cause deductions (empty for single-host runs).
    pub deductions: Vec<Deduction>,
}

/// Sequences probes, state persistence, and deduction for one run.
pub struct Orchestrator {
    fleet: FleetConfig,
    stack: ProbeStack,
}

impl Orchestrator {
    /// Build an orchestrator over an immutable fleet configuration and a
    /// set of probe implementations.
    pub fn new(fleet: FleetConfig, stack: ProbeStack) -> Self {
        Self { fleet, stack }
    }

    /// Run the pipeline for every host in `targets`.
    ///
    /// Per-host probe failures never abort the run; they surface as layer
    /// statuses and alerts. State is saved unconditionally at the end,
    /// even when every probe failed.
    ///
    /// # Errors
    ///
    /// Returns an error only when a target is not configured or the
    /// final state save fails.
    pub async fn run(&self, store: &StateStore, targets: &[String]) -> anyhow::Result<RunReport> {
        for target in targets {
            anyhow::ensure!(
                self.fleet.host(target).is_some(),
                "unknown host '{target}' (not in fleet config)"
            );
        }

        let mut states = store.load();
        let mut reports = Vec::with_capacity(targets.len());
        let mut alerts = Vec::new();

        for target in targets {
            let Some(cfg) = self.fleet.host(target) else {
                continue;
            };
            let state = states.entry(cfg.id.clone()).or_default();

            let report = check_host(&self.stack, cfg, state).await;
            state.last_check = Utc::now().to_rfc3339();

            alerts.extend(report.alerts.iter().cloned());
            reports.push(report);
        }

        // Persist adaptive-timeout history and rate counters no matter
        // how the probes went.
        if let Err(e) = store.save(&states) {
            warn!(error = %e, "state save failed");
            return Err(e);
        }

        let deductions = deduce_failure_causes(&reports);
        info!(
            hosts = reports.len(),
            alerts = alerts.len(),
            deductions = deductions.len(),
            "run complete"
        );

        Ok(RunReport {
            hosts: reports,
            alerts,
            deductions,
        })
    }

    /// Identifiers of every configured host, in config order.
    pub fn all_host_ids(&self) -> Vec<String> {
        self.fleet.hosts.iter().map(|h| h.id.clone()).collect()
    }
}
