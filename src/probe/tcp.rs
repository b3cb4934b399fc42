//! TCP connectivity checker backed by `tokio::net`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::TcpProber;

/// Production TCP prober; one connection attempt per target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTcpProber;

#[async_trait]
impl TcpProber for TokioTcpProber {
    async fn connect(&self, address: &str, port: u16, timeout: Duration) -> Option<Duration> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, TcpStream::connect((address, port))).await {
            Ok(Ok(_stream)) => Some(start.elapsed()),
            Ok(Err(e)) => {
                debug!(address, port, error = %e, "tcp connect failed");
                None
            }
            Err(_) => {
                debug!(address, port, timeout_secs = timeout.as_secs(), "tcp connect timed out");
                None
            }
        }
    }
}
