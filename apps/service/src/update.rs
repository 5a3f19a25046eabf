use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Current build version.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Release metadata returned by the update endpoint (GitHub-style).
#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    tag_name: String,
    html_url: String,
}

/// A newer published release, reported as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableUpdate {
    pub version: String,
    pub url: String,
}

/// Ask the release endpoint whether a newer version exists.
///
/// Purely advisory: every failure is logged and swallowed; nothing here
/// ever surfaces to the probing subsystem.
pub async fn check_for_update(endpoint: &str) -> Option<AvailableUpdate> {
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(10)).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "could not build update check client");
            return None;
        }
    };

    let response = match client.get(endpoint).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "update check request failed");
            return None;
        }
    };

    let release: ReleaseInfo = match response.json().await {
        Ok(release) => release,
        Err(e) => {
            debug!(error = %e, "update check response was not release metadata");
            return None;
        }
    };

    let latest = release.tag_name.trim_start_matches('v');
    if is_newer(latest, CURRENT_VERSION) {
        Some(AvailableUpdate { version: latest.to_string(), url: release.html_url })
    } else {
        debug!(current = CURRENT_VERSION, latest, "no newer release");
        None
    }
}

/// Numeric component-wise comparison of dotted version strings. A lexical
/// compare would order "1.2.10" before "1.2.9"; this does not.
fn is_newer(candidate: &str, current: &str) -> bool {
    version_triple(candidate) > version_triple(current)
}

fn version_triple(version: &str) -> (u64, u64, u64) {
    let mut parts = version.split('.').map(|part| part.trim().parse::<u64>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn numeric_comparison_beats_lexical() {
        assert!(is_newer("1.2.10", "1.2.9"));
        assert!(is_newer("2.0", "1.9.9"));
        assert!(!is_newer("1.2.9", "1.2.10"));
        assert!(!is_newer("1.0.0", "1.0.0"));
        assert!(!is_newer("not-a-version", "0.1.0"));
    }

    #[tokio::test]
    async fn newer_release_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": "v99.0.0",
                "html_url": "https://example.com/releases/99"
            })))
            .mount(&server)
            .await;

        let update = check_for_update(&server.uri()).await.unwrap();
        assert_eq!(update.version, "99.0.0");
        assert_eq!(update.url, "https://example.com/releases/99");
    }

    #[tokio::test]
    async fn current_release_reports_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": format!("v{CURRENT_VERSION}"),
                "html_url": "https://example.com/releases/current"
            })))
            .mount(&server)
            .await;

        assert_eq!(check_for_update(&server.uri()).await, None);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        // Unreachable endpoint.
        assert_eq!(check_for_update("http://127.0.0.1:1/").await, None);

        // Non-JSON body.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        assert_eq!(check_for_update(&server.uri()).await, None);
    }
}
