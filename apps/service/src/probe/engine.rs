use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use super::types::Sample;

/// A single-shot latency check against one URL.
///
/// Implementations never return an error: a probe that cannot complete is a
/// valid outcome, encoded in the sample's `latency_ms`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Sample;
}

/// HTTP prober backed by a shared client with a hard per-request timeout.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Sample {
        let start = Instant::now();

        // Any completed exchange counts as reachable, whatever the status
        // code says. HEAD keeps response bodies off the wire.
        match self.client.head(url).send().await {
            Ok(_) => Sample::success(start.elapsed().as_millis() as u64),
            Err(e) => {
                tracing::debug!(url, error = %e, "probe failed");
                Sample::failure()
            }
        }
    }
}
