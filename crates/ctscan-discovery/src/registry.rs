//! The loaded city list and the latest snapshot of each city.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ctscan_core::City;
use tokio::sync::broadcast;

use crate::process::{CityProcess, ProcessObserver};

/// Ordered collection of city snapshots, keyed by city name.
///
/// Every successful [`load`](Self::load) bumps the generation so updates
/// from pipelines started against an older list can be told apart.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: Vec<CityProcess>,
    generation: u64,
}

impl ProcessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with fresh idle snapshots.
    ///
    /// An empty `cities` slice is a no-op and returns `false`. Repeated
    /// names keep their first occurrence.
    pub fn load(&mut self, cities: &[City]) -> bool {
        if cities.is_empty() {
            return false;
        }
        let mut seen = HashSet::new();
        let mut processes = Vec::with_capacity(cities.len());
        for city in cities {
            if seen.insert(city.name.as_str()) {
                processes.push(CityProcess::idle(city));
            } else {
                tracing::warn!(city = %city.name, "duplicate city name; keeping the first row");
            }
        }
        self.processes = processes;
        self.generation += 1;
        tracing::info!(
            cities = self.processes.len(),
            generation = self.generation,
            "city list loaded"
        );
        true
    }

    /// Replace the snapshot with the same id. Unknown ids are ignored and
    /// return `false`.
    pub fn update(&mut self, process: CityProcess) -> bool {
        match self.processes.iter_mut().find(|p| p.id == process.id) {
            Some(slot) => {
                *slot = process;
                true
            }
            None => {
                tracing::debug!(city = %process.id, "update for unknown city ignored");
                false
            }
        }
    }

    #[must_use]
    pub fn list(&self) -> &[CityProcess] {
        &self.processes
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CityProcess> {
        self.processes.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Thread-safe registry handle that also broadcasts every accepted update.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<ProcessRegistry>>,
    events: broadcast::Sender<CityProcess>,
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRegistry {
    const EVENT_CAPACITY: usize = 256;

    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(ProcessRegistry::new())),
            events,
        }
    }

    pub fn load(&self, cities: &[City]) -> bool {
        self.lock().load(cities)
    }

    #[must_use]
    pub fn list(&self) -> Vec<CityProcess> {
        self.lock().list().to_vec()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<CityProcess> {
        self.lock().get(id).cloned()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation()
    }

    /// Stream of accepted snapshots. Slow receivers may observe
    /// `RecvError::Lagged` and should re-read [`list`](Self::list).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CityProcess> {
        self.events.subscribe()
    }

    /// Observer bound to the current generation.
    #[must_use]
    pub fn observer(&self) -> Arc<dyn ProcessObserver> {
        Arc::new(RegistryObserver {
            registry: self.clone(),
            generation: self.generation(),
        })
    }

    /// Apply `snapshot` if it was produced under `generation`.
    pub fn apply(&self, generation: u64, snapshot: CityProcess) -> bool {
        let accepted = {
            let mut registry = self.lock();
            if registry.generation() == generation {
                registry.update(snapshot.clone())
            } else {
                tracing::debug!(
                    city = %snapshot.id,
                    stale = generation,
                    current = registry.generation(),
                    "dropping update from a previous city list"
                );
                false
            }
        };
        if accepted {
            // No subscribers is fine.
            let _ = self.events.send(snapshot);
        }
        accepted
    }

    fn lock(&self) -> MutexGuard<'_, ProcessRegistry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RegistryObserver {
    registry: SharedRegistry,
    generation: u64,
}

impl ProcessObserver for RegistryObserver {
    fn on_update(&self, snapshot: &CityProcess) {
        self.registry.apply(self.generation, snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ProcessStatus;

    fn cities() -> Vec<City> {
        vec![
            City::new("Mumbai", 20_000_000),
            City::new("Delhi", 19_000_000),
            City::new("Pune", 7_000_000),
        ]
    }

    #[test]
    fn load_creates_idle_snapshots_in_order() {
        let mut registry = ProcessRegistry::new();
        assert!(registry.load(&cities()));
        let names: Vec<_> = registry.list().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mumbai", "Delhi", "Pune"]);
        assert!(registry
            .list()
            .iter()
            .all(|p| p.status == ProcessStatus::Idle && p.id == p.name));
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn empty_load_keeps_the_previous_list() {
        let mut registry = ProcessRegistry::new();
        registry.load(&cities());
        assert!(!registry.load(&[]));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn load_replaces_everything() {
        let mut registry = ProcessRegistry::new();
        registry.load(&cities());
        let mut mumbai = registry.get("Mumbai").cloned().expect("mumbai");
        mumbai.status = ProcessStatus::Completed;
        registry.update(mumbai);

        registry.load(&[City::new("Mumbai", 1)]);
        let reloaded = registry.get("Mumbai").expect("mumbai");
        assert_eq!(reloaded.status, ProcessStatus::Idle);
        assert_eq!(reloaded.population, 1);
        assert!(registry.get("Delhi").is_none());
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn duplicate_names_keep_the_first_row() {
        let mut registry = ProcessRegistry::new();
        registry.load(&[
            City::new("Pune", 7_000_000),
            City::new("Pune", 1),
            City::new("Agra", 2_000_000),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Pune").map(|p| p.population), Some(7_000_000));
    }

    #[test]
    fn update_replaces_by_id_and_ignores_unknown() {
        let mut registry = ProcessRegistry::new();
        registry.load(&cities());

        let mut delhi = registry.get("Delhi").cloned().expect("delhi");
        delhi.status = ProcessStatus::ScanningPincodes;
        assert!(registry.update(delhi));
        assert_eq!(
            registry.get("Delhi").map(|p| p.status),
            Some(ProcessStatus::ScanningPincodes)
        );

        let stranger = CityProcess::idle(&City::new("Atlantis", 0));
        assert!(!registry.update(stranger));
        assert_eq!(registry.len(), 3);
        assert!(registry.get("Atlantis").is_none());
    }

    #[test]
    fn stale_generation_updates_are_dropped() {
        let shared = SharedRegistry::new();
        shared.load(&cities());
        let old_observer = shared.observer();
        shared.load(&cities());

        let mut pune = shared.get("Pune").expect("pune");
        pune.status = ProcessStatus::Completed;
        old_observer.on_update(&pune);

        assert_eq!(shared.get("Pune").map(|p| p.status), Some(ProcessStatus::Idle));
    }

    #[tokio::test]
    async fn accepted_updates_are_broadcast() {
        let shared = SharedRegistry::new();
        shared.load(&cities());
        let mut events = shared.subscribe();
        let observer = shared.observer();

        let mut pune = shared.get("Pune").expect("pune");
        pune.status = ProcessStatus::ScanningPincodes;
        observer.on_update(&pune);
        observer.on_update(&CityProcess::idle(&City::new("Nowhere", 0)));

        let received = events.recv().await.expect("event");
        assert_eq!(received.id, "Pune");
        assert_eq!(received.status, ProcessStatus::ScanningPincodes);
        assert!(events.try_recv().is_err());
    }
}
