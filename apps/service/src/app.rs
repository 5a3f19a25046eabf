use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::bus::EventBus;
use crate::config::Config;
use crate::probe::{HttpProber, Prober};
use crate::registry::{RegistryError, SiteRegistry, SiteSeed};
use crate::scheduler::SweepLoop;
use crate::store::{KvStore, LibsqlStore};
use crate::{stats, transfer, update};

/// Everything the running application owns, wired explicitly at startup.
/// Components stay independently constructible; nothing lives in globals.
pub struct App {
    pub config: Config,
    pub registry: Arc<Mutex<SiteRegistry>>,
    pub prober: Arc<dyn Prober>,
    pub store: Arc<dyn KvStore>,
    pub bus: EventBus,
    sweeps: Arc<SweepLoop>,
}

impl App {
    /// Open the store, load persisted sites and wire the components.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let store: Arc<dyn KvStore> = Arc::new(LibsqlStore::open(&config.store.path).await?);
        let registry = Arc::new(Mutex::new(SiteRegistry::load(store.clone()).await));
        let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(config.probe_timeout())?);

        Ok(Self::with_components(config, store, registry, prober))
    }

    /// Wire a context from pre-built components; tests hand in doubles.
    pub fn with_components(
        config: Config,
        store: Arc<dyn KvStore>,
        registry: Arc<Mutex<SiteRegistry>>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let bus = EventBus::new(64);
        let sweeps = Arc::new(SweepLoop::new(
            registry.clone(),
            prober.clone(),
            bus.clone(),
            config.sweep_period(),
        ));
        Self { config, registry, prober, store, bus, sweeps }
    }

    /// Shared handle to the sweep loop.
    pub fn sweeps(&self) -> Arc<SweepLoop> {
        self.sweeps.clone()
    }

    /// Add a site and probe it immediately.
    pub async fn add_site(&self, name: &str, url: &str) -> Result<(), RegistryError> {
        let (index, url) = {
            let mut registry = self.registry.lock().await;
            let site = registry.add(name, url).await?;
            let url = site.url.clone();
            (registry.len() - 1, url)
        };
        self.bus.registry_changed();
        self.probe_one(index, &url).await;
        Ok(())
    }

    /// Rewrite a site's name and URL, then re-probe it. History survives
    /// the edit.
    pub async fn edit_site(&self, index: usize, name: &str, url: &str) -> Result<(), RegistryError> {
        let url = {
            let mut registry = self.registry.lock().await;
            registry.update(index, name, url).await?;
            registry.sites()[index].url.clone()
        };
        self.bus.registry_changed();
        self.probe_one(index, &url).await;
        Ok(())
    }

    pub async fn remove_site(&self, index: usize) -> Result<(), RegistryError> {
        self.registry.lock().await.remove(index).await?;
        self.bus.registry_changed();
        Ok(())
    }

    /// Replace the whole site list from import seeds, then sweep the new
    /// list once. Rejected imports leave the registry untouched.
    pub async fn import_sites(&self, seeds: Vec<SiteSeed>) -> Result<(), RegistryError> {
        self.registry.lock().await.replace_all(seeds).await?;
        self.bus.registry_changed();
        self.sweeps.sweep().await;
        Ok(())
    }

    /// Write the current site list as an export document. Returns the
    /// number of exported sites.
    pub async fn export_to(&self, path: &Path) -> Result<usize> {
        let registry = self.registry.lock().await;
        transfer::export_to_path(registry.sites(), path)?;
        Ok(registry.len())
    }

    /// Fire the advisory update check and publish on the bus if a newer
    /// release exists. Failures never propagate.
    pub async fn check_for_update(&self) {
        if !self.config.update.enabled {
            return;
        }
        if let Some(found) = update::check_for_update(&self.config.update.endpoint).await {
            tracing::info!(version = %found.version, "newer release available");
            self.bus.update_available(found.version, found.url);
        }
    }

    async fn probe_one(&self, index: usize, url: &str) {
        let sample = self.prober.probe(url).await;
        let mut registry = self.registry.lock().await;
        if registry.record(index, url, sample) {
            registry.persist().await;
            self.bus.sweep_completed(stats::compute_statistics(registry.sites()));
        }
    }
}
