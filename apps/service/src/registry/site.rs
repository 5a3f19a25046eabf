use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::types::{Sample, SiteStatus};

/// Bound on per-site history; the oldest entry is evicted first.
pub const HISTORY_LIMIT: usize = 20;

/// Display palette cycled by registry position. Opaque tags as far as the
/// core is concerned.
pub const COLOR_PALETTE: [&str; 10] = [
    "#3b82f6", "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
    "#6366f1", "#d946ef",
];

/// Palette color for a registry position.
pub fn color_for(position: usize) -> &'static str {
    COLOR_PALETTE[position % COLOR_PALETTE.len()]
}

/// One monitored target with its probe history.
///
/// Unknown fields from older persisted lists default in, so a list saved
/// without colors or update stamps still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub status: SiteStatus,
    #[serde(default)]
    pub history: VecDeque<Sample>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub color: String,
}

impl Site {
    /// Fresh site as created by add or import: unknown status, empty
    /// history, position-derived color.
    pub fn new(name: impl Into<String>, url: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            status: SiteStatus::Unknown,
            history: VecDeque::new(),
            last_updated: None,
            color: color_for(position).to_string(),
        }
    }

    /// Record a settled probe: derive status from the sample, stamp the
    /// update time and append to the bounded history ring.
    pub fn record(&mut self, sample: Sample) {
        self.status = if sample.is_online() { SiteStatus::Online } else { SiteStatus::Offline };
        self.last_updated = Some(sample.timestamp);
        self.history.push_back(sample);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}
