use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::SiteSeed;
use crate::registry::site::Site;
use crate::validation::ValidationError;

/// Version tag of the export document format.
pub const EXPORT_VERSION: u32 = 1;

/// Downloadable configuration document.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub sites: Vec<Site>,
}

impl ExportDocument {
    pub fn new(sites: &[Site]) -> Self {
        Self { version: EXPORT_VERSION, timestamp: Utc::now(), sites: sites.to_vec() }
    }
}

/// Serialize the current site list into an export document.
pub fn export_string(sites: &[Site]) -> Result<String> {
    serde_json::to_string_pretty(&ExportDocument::new(sites)).context("serializing export document")
}

/// Write the export document to a file, creating parent directories.
pub fn export_to_path(sites: &[Site], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(path, export_string(sites)?).with_context(|| format!("writing {}", path.display()))
}

/// Accepted import shapes: a full export document, or a bare URL list.
/// Per-site extras (status, history, ...) are tolerated and ignored, so a
/// previously exported document imports cleanly.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Document { sites: Vec<SiteSeed> },
    UrlList(Vec<SiteSeed>),
}

/// Parse an import payload into site seeds. Malformed JSON or a
/// non-conforming shape is a payload validation error; per-site validity
/// is the registry's call at replacement time.
pub fn parse_import(raw: &str) -> Result<Vec<SiteSeed>, ValidationError> {
    match serde_json::from_str::<ImportPayload>(raw) {
        Ok(ImportPayload::Document { sites }) | Ok(ImportPayload::UrlList(sites)) => Ok(sites),
        Err(e) => {
            tracing::debug!(error = %e, "import payload failed to parse");
            Err(ValidationError::MalformedPayload)
        }
    }
}
