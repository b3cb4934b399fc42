//! Remote command execution through the system `ssh` client.
//!
//! Relies on the operator's SSH configuration for alias resolution and
//! credentials; `BatchMode=yes` keeps a broken agent from blocking the
//! run on a password prompt.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{RemoteExecError, RemoteExecutor, RemoteOutput};

/// Grace period on top of the connect timeout before the whole command
/// is abandoned, in seconds.
const EXEC_GRACE_SECS: u64 = 5;

/// Production executor shelling out to the `ssh` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSshExecutor;

#[async_trait]
impl RemoteExecutor for OpenSshExecutor {
    async fn execute(
        &self,
        alias: &str,
        command: &str,
        timeout_secs: u64,
    ) -> Result<RemoteOutput, RemoteExecError> {
        let start = Instant::now();
        let connect_timeout = format!("ConnectTimeout={timeout_secs}");

        let output = Command::new("ssh")
            .arg("-o")
            .arg(&connect_timeout)
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(alias)
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let budget = Duration::from_secs(timeout_secs.saturating_add(EXEC_GRACE_SECS));
        let result = match tokio::time::timeout(budget, output).await {
            Ok(result) => result,
            Err(_) => {
                debug!(alias, timeout_secs, "remote command timed out");
                return Err(RemoteExecError::Timeout {
                    seconds: timeout_secs,
                    elapsed: start.elapsed(),
                });
            }
        };

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RemoteExecError::BinaryMissing("ssh".to_owned())
            } else {
                RemoteExecError::Spawn(e.to_string())
            }
        })?;

        Ok(RemoteOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        })
    }
}
