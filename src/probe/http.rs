//! HTTP probe backed by `reqwest`.

use std::error::Error as _;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{HttpProbe, HttpProbeError, HttpProber};

/// Production HTTP prober issuing HEAD requests through a shared client.
#[derive(Debug, Clone)]
pub struct ReqwestProber {
    client: reqwest::Client,
}

impl ReqwestProber {
    /// Build a prober with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, HttpProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpProbeError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Classify a reqwest failure as TLS or plain network trouble.
    ///
    /// reqwest does not expose a TLS discriminant, so the error source
    /// chain is inspected for certificate/handshake wording.
    fn classify(err: &reqwest::Error) -> HttpProbeError {
        let mut texts = vec![err.to_string()];
        let mut source = err.source();
        while let Some(inner) = source {
            texts.push(inner.to_string());
            source = inner.source();
        }
        let joined = texts.join(": ").to_ascii_lowercase();
        if joined.contains("certificate") || joined.contains("tls") || joined.contains("ssl") {
            HttpProbeError::Tls(texts.join(": "))
        } else {
            HttpProbeError::Network(texts.join(": "))
        }
    }
}

#[async_trait]
impl HttpProber for ReqwestProber {
    async fn probe(&self, url: &str, timeout: Duration) -> Result<HttpProbe, HttpProbeError> {
        let start = Instant::now();
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::classify(&e))?;
        Ok(HttpProbe {
            status_code: response.status().as_u16(),
            elapsed: start.elapsed(),
        })
    }
}
