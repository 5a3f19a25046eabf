/// Probe engine module - single-shot latency checks against monitored URLs
///
/// This module is responsible for:
/// - Issuing one timed HTTP request per site per sweep
/// - Encoding failure as data (`latency_ms = None`), never as an error
pub mod engine;
pub mod types;

pub use engine::{HttpProber, Prober};
pub use types::{Sample, SiteStatus};
