//! Probe layer seams and shared probe types.
//!
//! Each external collaborator (HTTP client, TCP checker, remote command
//! execution) is a trait so the pipeline can be driven by synthetic
//! implementations in tests. Production implementations live in the
//! submodules.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub mod http;
pub mod ssh;
pub mod tcp;

pub use crate::state::LayerStatus;

/// Result of one pipeline stage: a layer status, its alerts, and the
/// observed duration. Transient, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    /// Layer status produced by the stage.
    pub status: LayerStatus,
    /// Human-readable alerts raised while probing.
    pub alerts: Vec<String>,
    /// Wall-clock duration of the decisive attempt, in seconds.
    pub duration_seconds: f64,
}

impl ProbeOutcome {
    /// Outcome with no alerts and zero duration.
    pub fn status_only(status: LayerStatus) -> Self {
        Self {
            status,
            alerts: Vec::new(),
            duration_seconds: 0.0,
        }
    }
}

/// Successful HTTP probe observation.
#[derive(Debug, Clone, Copy)]
pub struct HttpProbe {
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Time to response.
    pub elapsed: Duration,
}

/// Failure modes of an HTTP probe.
///
/// A TLS error still proves something is answering on the port, so the
/// pipeline treats it differently from plain network failure.
#[derive(Debug, thiserror::Error)]
pub enum HttpProbeError {
    /// TLS handshake or certificate validation failed.
    #[error("tls error: {0}")]
    Tls(String),
    /// Connection, DNS, or timeout failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Lightweight HTTP reachability checker.
#[async_trait]
pub trait HttpProber: Send + Sync {
    /// Issue a HEAD-equivalent request and report status code and latency.
    async fn probe(&self, url: &str, timeout: Duration) -> Result<HttpProbe, HttpProbeError>;
}

/// TCP connectivity checker.
#[async_trait]
pub trait TcpProber: Send + Sync {
    /// Attempt a connection; `Some(elapsed)` on success, `None` when the
    /// target was unreachable within the timeout.
    async fn connect(&self, address: &str, port: u16, timeout: Duration) -> Option<Duration>;
}

/// Captured output of a completed remote command.
#[derive(Debug, Clone)]
pub struct RemoteOutput {
    /// Process exit code (`None` when unavailable).
    pub exit_code: Option<i32>,
    /// Captured stdout text.
    pub stdout: String,
    /// Captured stderr text.
    pub stderr: String,
    /// Wall-clock duration of the execution.
    pub duration: Duration,
}

impl RemoteOutput {
    /// Returns `true` when the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors produced by remote command execution.
///
/// A missing client binary is non-retryable and must stay distinguishable
/// from an ordinary timeout.
#[derive(Debug, thiserror::Error)]
pub enum RemoteExecError {
    /// The command did not complete within the timeout budget.
    #[error("command timed out after {seconds}s")]
    Timeout {
        /// Timeout budget in seconds.
        seconds: u64,
        /// Wall-clock time spent before giving up.
        elapsed: Duration,
    },
    /// The remote-command client binary is not installed.
    #[error("remote command binary not found: {0}")]
    BinaryMissing(String),
    /// The command could not be spawned or its output not collected.
    #[error("remote command failed to run: {0}")]
    Spawn(String),
}

/// Remote command execution over a named connection alias.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Execute `command` on `alias` under `timeout_secs`, capturing output.
    async fn execute(
        &self,
        alias: &str,
        command: &str,
        timeout_secs: u64,
    ) -> Result<RemoteOutput, RemoteExecError>;
}
