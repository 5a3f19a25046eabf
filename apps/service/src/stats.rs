use chrono::{DateTime, Utc};

use crate::probe::types::SiteStatus;
use crate::registry::site::Site;

/// Cross-site dashboard statistics derived from current registry state.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub online: usize,
    pub offline: usize,

    /// Rounded mean over the non-null samples of online sites; `None`
    /// when there is nothing to average.
    pub avg_latency_ms: Option<u64>,

    /// Every recorded sample across all sites, newest first.
    pub feed: Vec<FeedEntry>,
}

/// One row of the newest-first latency feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub site: String,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: Option<u64>,
    pub color: String,
}

/// Per-site latency series aligned to a shared `1..=window` index axis,
/// ready for a plotting widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<Option<u64>>,
}

/// Pure function over current registry state; no rendering, no mutation.
pub fn compute_statistics(sites: &[Site]) -> Stats {
    let online = sites.iter().filter(|s| s.status == SiteStatus::Online).count();
    let offline = sites.iter().filter(|s| s.status == SiteStatus::Offline).count();

    // Offline sites are excluded entirely, even if they carry older
    // successful samples.
    let latencies: Vec<u64> = sites
        .iter()
        .filter(|s| s.status == SiteStatus::Online)
        .flat_map(|s| s.history.iter())
        .filter_map(|sample| sample.latency_ms)
        .collect();
    let avg_latency_ms = if latencies.is_empty() {
        None
    } else {
        let sum: u64 = latencies.iter().sum();
        Some((sum as f64 / latencies.len() as f64).round() as u64)
    };

    let mut feed: Vec<FeedEntry> = sites
        .iter()
        .flat_map(|s| {
            s.history.iter().map(|sample| FeedEntry {
                site: s.name.clone(),
                timestamp: sample.timestamp,
                latency_ms: sample.latency_ms,
                color: s.color.clone(),
            })
        })
        .collect();
    // Newest first; sort_by is stable, so ties keep encounter order.
    feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Stats { online, offline, avg_latency_ms, feed }
}

/// Last `window` latency values per site, padded with `None` at the tail.
pub fn chart_series(sites: &[Site], window: usize) -> Vec<ChartSeries> {
    sites
        .iter()
        .map(|s| {
            let skip = s.history.len().saturating_sub(window);
            let mut points: Vec<Option<u64>> =
                s.history.iter().skip(skip).map(|sample| sample.latency_ms).collect();
            points.resize(window, None);
            ChartSeries { name: s.name.clone(), color: s.color.clone(), points }
        })
        .collect()
}
