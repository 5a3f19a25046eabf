use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::probe::Prober;
use crate::registry::SiteRegistry;
use crate::stats;

/// Cooperative sweep loop: probes every registered site concurrently at a
/// fixed period, records the results, persists and announces completion.
///
/// Registry state is only touched outside the network suspension points -
/// a snapshot before the fan-out, recording after the fan-in - so user
/// mutations interleave safely between sweeps.
pub struct SweepLoop {
    registry: Arc<Mutex<SiteRegistry>>,
    prober: Arc<dyn Prober>,
    bus: EventBus,
    period: Duration,
    active: AtomicBool,
    in_flight: AtomicBool,
}

impl SweepLoop {
    pub fn new(
        registry: Arc<Mutex<SiteRegistry>>,
        prober: Arc<dyn Prober>,
        bus: EventBus,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            prober,
            bus,
            period,
            active: AtomicBool::new(true),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Spawn the repeating loop on the runtime.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Request a cooperative stop; honored between ticks. In-flight probes
    /// are bounded by their own timeout, nothing is hard-cancelled.
    pub fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    async fn run(&self) {
        let mut timer = interval(self.period);
        // A tick that lands while a sweep is still running is dropped,
        // not queued.
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick fires immediately, probing persisted sites on
        // startup.
        while self.active.load(Ordering::Relaxed) {
            timer.tick().await;
            if !self.active.load(Ordering::Relaxed) {
                break;
            }
            self.sweep().await;
        }
        info!("sweep loop stopped");
    }

    /// Probe every current site concurrently and record the outcomes.
    /// Returns false when another sweep is already in flight (the new one
    /// is skipped, never queued or overlapped).
    pub async fn sweep(&self) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("sweep already in flight, skipping");
            return false;
        }

        let snapshot: Vec<(usize, String)> = {
            let registry = self.registry.lock().await;
            registry.sites().iter().enumerate().map(|(i, s)| (i, s.url.clone())).collect()
        };

        // Fan-out: total sweep latency is bounded by the slowest single
        // probe, not the sum.
        let samples = join_all(snapshot.iter().map(|(_, url)| self.prober.probe(url))).await;

        let mut registry = self.registry.lock().await;
        for ((index, url), sample) in snapshot.into_iter().zip(samples) {
            registry.record(index, &url, sample);
        }
        registry.persist().await;
        self.bus.sweep_completed(stats::compute_statistics(registry.sites()));
        drop(registry);

        self.in_flight.store(false, Ordering::SeqCst);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CoreEvent;
    use crate::probe::types::{Sample, SiteStatus};
    use crate::store::{KvStore, MemoryStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::time::Instant;

    /// Prober double with a per-URL delay and outcome.
    struct FakeProber {
        plans: HashMap<String, (Duration, Option<u64>)>,
    }

    impl FakeProber {
        fn new(plans: &[(&str, Duration, Option<u64>)]) -> Self {
            let plans = plans
                .iter()
                .map(|(url, delay, latency)| (url.to_string(), (*delay, *latency)))
                .collect();
            Self { plans }
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, url: &str) -> Sample {
            let (delay, latency) =
                self.plans.get(url).copied().unwrap_or((Duration::from_millis(10), Some(5)));
            tokio::time::sleep(delay).await;
            Sample { timestamp: chrono::Utc::now(), latency_ms: latency }
        }
    }

    async fn registry_with(urls: &[&str]) -> Arc<Mutex<SiteRegistry>> {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut registry = SiteRegistry::new(store);
        for url in urls {
            registry.add(url, url).await.unwrap();
        }
        Arc::new(Mutex::new(registry))
    }

    fn sweep_loop(registry: Arc<Mutex<SiteRegistry>>, prober: FakeProber) -> Arc<SweepLoop> {
        Arc::new(SweepLoop::new(
            registry,
            Arc::new(prober),
            EventBus::new(8),
            Duration::from_secs(15),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_runs_probes_concurrently() {
        let urls = ["https://a.com", "https://b.com", "https://c.com", "https://d.com", "https://e.com"];
        let registry = registry_with(&urls).await;

        // One site hangs to its 3 s timeout, the rest answer fast.
        let prober = FakeProber::new(&[
            ("https://a.com", Duration::from_millis(3000), None),
            ("https://b.com", Duration::from_millis(80), Some(80)),
            ("https://c.com", Duration::from_millis(90), Some(90)),
            ("https://d.com", Duration::from_millis(60), Some(60)),
            ("https://e.com", Duration::from_millis(70), Some(70)),
        ]);
        let sweeps = sweep_loop(registry.clone(), prober);

        let started = Instant::now();
        assert!(sweeps.sweep().await);
        let elapsed = started.elapsed();

        // Bounded by the slowest probe, not the sum (~3.3 s sequential
        // would be 3.3 s + 4 * fast; 5 * 3 s if everything hung).
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3500), "elapsed {elapsed:?}");

        let registry = registry.lock().await;
        assert_eq!(registry.sites()[0].status, SiteStatus::Offline);
        for site in &registry.sites()[1..] {
            assert_eq!(site.status, SiteStatus::Online);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_sweep_is_skipped() {
        let registry = registry_with(&["https://a.com"]).await;
        let prober = FakeProber::new(&[("https://a.com", Duration::from_secs(2), Some(1))]);
        let sweeps = sweep_loop(registry, prober);

        let first = tokio::spawn({
            let sweeps = sweeps.clone();
            async move { sweeps.sweep().await }
        });
        // Let the first sweep take the in-flight flag.
        tokio::task::yield_now().await;

        assert!(!sweeps.sweep().await);
        assert!(first.await.unwrap());

        // The guard clears once the sweep settles.
        assert!(sweeps.sweep().await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_publishes_statistics() {
        let registry = registry_with(&["https://a.com", "https://b.com"]).await;
        let prober = FakeProber::new(&[
            ("https://a.com", Duration::from_millis(10), Some(25)),
            ("https://b.com", Duration::from_millis(10), None),
        ]);
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let sweeps = Arc::new(SweepLoop::new(
            registry,
            Arc::new(prober),
            bus,
            Duration::from_secs(15),
        ));

        sweeps.sweep().await;

        match events.try_recv().unwrap() {
            CoreEvent::SweepCompleted(stats) => {
                assert_eq!(stats.online, 1);
                assert_eq!(stats.offline, 1);
                assert_eq!(stats.avg_latency_ms, Some(25));
                assert_eq!(stats.feed.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn results_for_sites_removed_mid_sweep_are_dropped() {
        let registry = registry_with(&["https://a.com", "https://b.com"]).await;
        let prober = FakeProber::new(&[
            ("https://a.com", Duration::from_millis(500), Some(5)),
            ("https://b.com", Duration::from_millis(500), Some(5)),
        ]);
        let sweeps = sweep_loop(registry.clone(), prober);

        let sweep = tokio::spawn({
            let sweeps = sweeps.clone();
            async move { sweeps.sweep().await }
        });
        tokio::task::yield_now().await;

        // User deletes the first site while probes are in flight.
        registry.lock().await.remove(0).await.unwrap();
        sweep.await.unwrap();

        let registry = registry.lock().await;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sites()[0].url, "https://b.com");
        // b's result recorded at its (shifted) index 0 would have hit the
        // wrong slot without the URL guard; with it, only index 1 carried
        // b's URL, so nothing landed.
        assert!(registry.sites()[0].history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_loop_exits() {
        let registry = registry_with(&[]).await;
        let prober = FakeProber::new(&[]);
        let sweeps = sweep_loop(registry, prober);

        let handle = sweeps.clone().spawn();
        tokio::task::yield_now().await;
        sweeps.stop();

        // The next tick observes the flag and the task finishes.
        tokio::time::timeout(Duration::from_secs(60), handle).await.unwrap().unwrap();
    }
}
