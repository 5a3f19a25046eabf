/// Site registry - the mutable, ordered list of monitored targets
///
/// The registry is the sole owner of all site state. Every mutation
/// persists the full list (best-effort) under a fixed key in the local
/// store; probe results flow in through [`SiteRegistry::record`].
pub mod site;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::probe::types::Sample;
use crate::store::{KvStore, SITES_KEY};
use crate::validation::{self, ValidationError};

pub use site::Site;

use site::color_for;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("site index {0} is out of bounds")]
    IndexOutOfBounds(usize),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// User-supplied fields for a site, before defaults are applied. Extra
/// fields in import payloads are tolerated and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSeed {
    pub name: String,
    pub url: String,
}

/// Ordered collection of monitored sites.
pub struct SiteRegistry {
    sites: Vec<Site>,
    store: Arc<dyn KvStore>,
}

impl SiteRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { sites: Vec::new(), store }
    }

    /// Load the persisted site list. Missing or corrupt data yields an
    /// empty registry, never an error.
    pub async fn load(store: Arc<dyn KvStore>) -> Self {
        let sites = match store.get(SITES_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Site>>(&raw) {
                Ok(sites) => sites,
                Err(e) => {
                    warn!(error = %e, "persisted site list is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "could not read persisted site list, starting empty");
                Vec::new()
            }
        };

        let mut registry = Self { sites, store };
        registry.reassign_colors();
        registry
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Append a validated site and return it for immediate probing.
    pub async fn add(&mut self, name: &str, url: &str) -> Result<&Site, RegistryError> {
        validation::validate_site(name, url)?;

        let index = self.sites.len();
        self.sites.push(Site::new(name.trim(), validation::normalize_url(url.trim()), index));
        self.persist().await;
        Ok(&self.sites[index])
    }

    /// Rewrite name and URL in place. History and status are untouched.
    pub async fn update(&mut self, index: usize, name: &str, url: &str) -> Result<(), RegistryError> {
        if index >= self.sites.len() {
            return Err(RegistryError::IndexOutOfBounds(index));
        }
        validation::validate_site(name, url)?;

        let site = &mut self.sites[index];
        site.name = name.trim().to_string();
        site.url = validation::normalize_url(url.trim());
        self.persist().await;
        Ok(())
    }

    /// Remove a site; subsequent indices shift down and colors follow
    /// display order.
    pub async fn remove(&mut self, index: usize) -> Result<(), RegistryError> {
        if index >= self.sites.len() {
            return Err(RegistryError::IndexOutOfBounds(index));
        }

        self.sites.remove(index);
        self.reassign_colors();
        self.persist().await;
        Ok(())
    }

    /// Wholesale replacement used by import. Every seed must pass the
    /// validity predicate or nothing changes - there is no partial import.
    pub async fn replace_all(&mut self, seeds: Vec<SiteSeed>) -> Result<(), RegistryError> {
        for seed in &seeds {
            validation::validate_site(&seed.name, &seed.url)?;
        }

        self.sites = seeds
            .into_iter()
            .enumerate()
            .map(|(index, seed)| {
                Site::new(seed.name.trim(), validation::normalize_url(seed.url.trim()), index)
            })
            .collect();
        self.persist().await;
        Ok(())
    }

    /// Record a settled probe against the site at `index`, guarded by the
    /// URL the probe actually hit. Returns false when the site was edited
    /// or removed while the probe was in flight.
    pub fn record(&mut self, index: usize, url: &str, sample: Sample) -> bool {
        match self.sites.get_mut(index) {
            Some(site) if site.url == url => {
                site.record(sample);
                true
            }
            _ => {
                debug!(index, url, "dropping probe result for a site changed mid-sweep");
                false
            }
        }
    }

    /// Best-effort persistence of the full list under the fixed key.
    /// Failures are logged and swallowed - never fatal for the session.
    pub async fn persist(&self) {
        let payload = match serde_json::to_string(&self.sites) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "could not serialize site list");
                return;
            }
        };
        if let Err(e) = self.store.put(SITES_KEY, &payload).await {
            warn!(error = %e, "could not persist site list");
        }
    }

    fn reassign_colors(&mut self) {
        for (index, site) in self.sites.iter_mut().enumerate() {
            site.color = color_for(index).to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::validation::Field;

    fn store() -> Arc<dyn KvStore> {
        Arc::new(MemoryStore::new())
    }

    fn seed(name: &str, url: &str) -> SiteSeed {
        SiteSeed { name: name.to_string(), url: url.to_string() }
    }

    #[tokio::test]
    async fn add_normalizes_and_assigns_color() {
        let mut registry = SiteRegistry::new(store());
        let site = registry.add("Example", "example.com").await.unwrap();

        assert_eq!(site.url, "https://example.com");
        assert_eq!(site.color, site::COLOR_PALETTE[0]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_empty_name() {
        let mut registry = SiteRegistry::new(store());
        let err = registry.add("  ", "example.com").await.unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Invalid(ValidationError::Empty(Field::Name))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_history_and_status() {
        let mut registry = SiteRegistry::new(store());
        registry.add("A", "a.com").await.unwrap();
        registry.record(0, "https://a.com", Sample::success(42));

        registry.update(0, "Renamed", "b.com").await.unwrap();

        let site = &registry.sites()[0];
        assert_eq!(site.name, "Renamed");
        assert_eq!(site.url, "https://b.com");
        assert_eq!(site.history.len(), 1);
        assert_eq!(site.status, crate::probe::SiteStatus::Online);
    }

    #[tokio::test]
    async fn update_out_of_bounds_fails() {
        let mut registry = SiteRegistry::new(store());
        let err = registry.update(3, "A", "a.com").await.unwrap_err();
        assert!(matches!(err, RegistryError::IndexOutOfBounds(3)));
    }

    #[tokio::test]
    async fn remove_shifts_and_recolors() {
        let mut registry = SiteRegistry::new(store());
        registry.add("A", "a.com").await.unwrap();
        registry.add("B", "b.com").await.unwrap();
        registry.add("C", "c.com").await.unwrap();

        registry.remove(0).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.sites()[0].name, "B");
        assert_eq!(registry.sites()[0].color, site::COLOR_PALETTE[0]);
        assert_eq!(registry.sites()[1].color, site::COLOR_PALETTE[1]);

        assert!(matches!(
            registry.remove(2).await.unwrap_err(),
            RegistryError::IndexOutOfBounds(2)
        ));
    }

    #[tokio::test]
    async fn import_is_rejected_wholesale() {
        let mut registry = SiteRegistry::new(store());
        registry.add("Kept", "kept.com").await.unwrap();

        let err = registry
            .replace_all(vec![seed("A", "a.com"), seed("", "b.com")])
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Invalid(ValidationError::Empty(Field::Name))));
        // Registry unchanged from before the import attempt.
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sites()[0].name, "Kept");
    }

    #[tokio::test]
    async fn import_replaces_wholesale_with_fresh_defaults() {
        let mut registry = SiteRegistry::new(store());
        registry.add("Old", "old.com").await.unwrap();
        registry.record(0, "https://old.com", Sample::success(10));

        registry
            .replace_all(vec![seed("A", "a.com"), seed("B", "https://b.com")])
            .await
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.sites()[0].url, "https://a.com");
        assert!(registry.sites()[0].history.is_empty());
        assert_eq!(registry.sites()[1].url, "https://b.com");
    }

    #[tokio::test]
    async fn record_drops_results_for_changed_sites() {
        let mut registry = SiteRegistry::new(store());
        registry.add("A", "a.com").await.unwrap();

        // URL changed while a probe was in flight.
        assert!(!registry.record(0, "https://stale.com", Sample::success(5)));
        assert!(registry.sites()[0].history.is_empty());

        // Index gone entirely.
        assert!(!registry.record(7, "https://a.com", Sample::success(5)));
    }

    #[tokio::test]
    async fn persists_and_reloads_through_the_store() {
        let store = store();
        let mut registry = SiteRegistry::new(store.clone());
        registry.add("A", "a.com").await.unwrap();
        registry.record(0, "https://a.com", Sample::success(33));
        registry.persist().await;

        let reloaded = SiteRegistry::load(store).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.sites()[0].name, "A");
        assert_eq!(reloaded.sites()[0].history.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_persisted_data_loads_empty() {
        let store = store();
        store.put(SITES_KEY, "{not json").await.unwrap();

        let registry = SiteRegistry::load(store).await;
        assert!(registry.is_empty());
    }
}
