use tokio::sync::broadcast;
use tracing::debug;

use crate::stats::Stats;

/// Notifications the presentation layer subscribes to. The core never
/// renders; it announces state changes and hands over plain data.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Sites were added, edited, removed or replaced.
    RegistryChanged,

    /// A probe sweep finished; fresh statistics attached.
    SweepCompleted(Stats),

    /// Advisory only: a newer release was published.
    UpdateAvailable { version: String, url: String },
}

/// Broadcast fan-out owned by the application context. Clones share the
/// same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn registry_changed(&self) {
        self.publish(CoreEvent::RegistryChanged);
    }

    pub fn sweep_completed(&self, stats: Stats) {
        debug!(online = stats.online, offline = stats.offline, "publishing sweep results");
        self.publish(CoreEvent::SweepCompleted(stats));
    }

    pub fn update_available(&self, version: String, url: String) {
        debug!(version = %version, "publishing update notice");
        self.publish(CoreEvent::UpdateAvailable { version, url });
    }

    fn publish(&self, event: CoreEvent) {
        // Ignore errors if there are no receivers
        let _ = self.tx.send(event);
    }
}
