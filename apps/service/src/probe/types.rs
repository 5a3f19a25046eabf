use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reachability state derived from the most recent probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    /// No probe has completed yet
    #[default]
    Unknown,
    Online,
    Offline,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Unknown => write!(f, "unknown"),
            SiteStatus::Online => write!(f, "online"),
            SiteStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// When the probe settled
    pub timestamp: DateTime<Utc>,

    /// Round-trip time in milliseconds; `None` when the probe failed or
    /// timed out
    #[serde(rename = "latency")]
    pub latency_ms: Option<u64>,
}

impl Sample {
    /// Sample for a request that completed within the timeout
    pub fn success(latency_ms: u64) -> Self {
        Self { timestamp: Utc::now(), latency_ms: Some(latency_ms) }
    }

    /// Sample for a request that errored, timed out or was aborted
    pub fn failure() -> Self {
        Self { timestamp: Utc::now(), latency_ms: None }
    }

    pub fn is_online(&self) -> bool {
        self.latency_ms.is_some()
    }
}
