//! Runs city pipelines as background tasks against a shared registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ctscan_core::{City, LocationCoords};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::cancel::CancelFlag;
use crate::contracts::{CenterFinder, PincodeResolver};
use crate::process::{CityDiscoveryProcess, CityProcess, TransitionError, Trigger};
use crate::registry::SharedRegistry;
use crate::status::ProcessStatus;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("unknown city: {0}")]
    UnknownCity(String),

    /// A pipeline for this city is still scanning.
    #[error("city {0} is still finishing its previous run")]
    Busy(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// A spawned pipeline. `done` flips to `true` after the pipeline's last
/// commit; its sender is dropped if the task is aborted or panics.
#[derive(Debug)]
struct Worker {
    cancel: CancelFlag,
    task: JoinHandle<()>,
    done: watch::Receiver<bool>,
}

impl Worker {
    fn spawn<F>(cancel: CancelFlag, pipeline: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done) = watch::channel(false);
        let task = tokio::spawn(async move {
            pipeline.await;
            done_tx.send_replace(true);
        });
        Self { cancel, task, done }
    }

    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Owns the registry and at most one running pipeline per city.
///
/// Every trigger validates against the registry's current snapshot and
/// publishes its first transition before returning, so a caller that reads
/// the registry right after `start` or `confirm` already sees the scanning
/// state. Must be used from within a Tokio runtime.
pub struct DiscoveryCoordinator {
    registry: SharedRegistry,
    resolver: Arc<dyn PincodeResolver>,
    finder: Arc<dyn CenterFinder>,
    location: Option<LocationCoords>,
    workers: Mutex<HashMap<String, Worker>>,
}

impl std::fmt::Debug for DiscoveryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCoordinator")
            .field("registry", &self.registry)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl DiscoveryCoordinator {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn PincodeResolver>,
        finder: Arc<dyn CenterFinder>,
        location: Option<LocationCoords>,
    ) -> Self {
        if location.is_none() {
            tracing::warn!("no location configured; center lookups will not be location-biased");
        }
        Self {
            registry: SharedRegistry::new(),
            resolver,
            finder,
            location,
            workers: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Replace the city list. Every running pipeline is cancelled and its
    /// task aborted first. An empty list is a no-op returning `false`.
    pub fn load(&self, cities: &[City]) -> bool {
        if cities.is_empty() {
            tracing::warn!("ignoring empty city list");
            return false;
        }
        let mut workers = self.workers();
        for (city, worker) in workers.drain() {
            worker.cancel.cancel();
            if worker.is_running() {
                tracing::info!(city = %city, "aborting pipeline for replaced city list");
            }
            worker.task.abort();
        }
        self.registry.load(cities)
    }

    #[must_use]
    pub fn list(&self) -> Vec<CityProcess> {
        self.registry.list()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<CityProcess> {
        self.registry.get(id)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CityProcess> {
        self.registry.subscribe()
    }

    /// Begin pincode discovery for `id` on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownCity`] for an id not in the list,
    /// [`CoordinatorError::Busy`] while the city is still scanning, and
    /// [`CoordinatorError::Transition`] unless the city is `Idle`.
    pub fn start(&self, id: &str) -> Result<CityProcess, CoordinatorError> {
        let mut workers = self.workers();
        let mut process = self.process_for(id)?;
        Self::ensure_not_busy(&workers, id, process.snapshot())?;
        process.begin_start()?;
        let snapshot = process.snapshot().clone();

        let resolver = Arc::clone(&self.resolver);
        let worker = Worker::spawn(process.cancel_flag(), async move {
            process.run_pincode_scan(resolver.as_ref()).await;
        });
        workers.insert(id.to_string(), worker);
        Ok(snapshot)
    }

    /// Begin the center scan for `id` on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownCity`] for an id not in the list,
    /// [`CoordinatorError::Busy`] while the city is still scanning, and
    /// [`CoordinatorError::Transition`] unless the city is
    /// `AwaitingConfirmation`.
    pub fn confirm(&self, id: &str) -> Result<CityProcess, CoordinatorError> {
        let mut workers = self.workers();
        let mut process = self.process_for(id)?;
        Self::ensure_not_busy(&workers, id, process.snapshot())?;
        process.begin_confirm()?;
        let snapshot = process.snapshot().clone();

        let finder = Arc::clone(&self.finder);
        let location = self.location;
        let worker = Worker::spawn(process.cancel_flag(), async move {
            process.run_center_scan(finder.as_ref(), location).await;
        });
        workers.insert(id.to_string(), worker);
        Ok(snapshot)
    }

    /// Request a stop. A running scan stops at its next step; a city
    /// awaiting confirmation is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownCity`] for an id not in the list
    /// and [`CoordinatorError::Transition`] when there is nothing to stop.
    pub fn stop(&self, id: &str) -> Result<CityProcess, CoordinatorError> {
        let workers = self.workers();
        let snapshot = self
            .registry
            .get(id)
            .ok_or_else(|| CoordinatorError::UnknownCity(id.to_string()))?;

        match snapshot.status {
            status if status.is_processing() => {
                if let Some(worker) = workers.get(id) {
                    worker.cancel.cancel();
                }
                tracing::info!(city = %id, status = %status, "stop requested");
                Ok(snapshot)
            }
            ProcessStatus::AwaitingConfirmation => {
                drop(workers);
                self.reject(id)
            }
            from => Err(TransitionError::InvalidTrigger {
                from,
                trigger: Trigger::Stop,
            }
            .into()),
        }
    }

    /// Cancel every running pipeline.
    pub fn stop_all(&self) {
        let workers = self.workers();
        for (city, worker) in &*workers {
            tracing::debug!(city = %city, "stop requested");
            worker.cancel.cancel();
        }
    }

    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownCity`] for an id not in the list
    /// and [`CoordinatorError::Transition`] unless the city is
    /// `AwaitingConfirmation`.
    pub fn reject(&self, id: &str) -> Result<CityProcess, CoordinatorError> {
        let _workers = self.workers();
        let mut process = self.process_for(id)?;
        process.reject()?;
        Ok(process.into_snapshot())
    }

    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownCity`] for an id not in the list
    /// and [`CoordinatorError::Transition`] unless the city has completed,
    /// stopped, or failed.
    pub fn reset(&self, id: &str) -> Result<CityProcess, CoordinatorError> {
        let mut workers = self.workers();
        let mut process = self.process_for(id)?;
        process.reset()?;
        workers.remove(id);
        Ok(process.into_snapshot())
    }

    /// Wait for the city's current pipeline, if any, to make its last
    /// commit and return the resulting snapshot.
    ///
    /// The task stays owned by the coordinator, so dropping this future
    /// leaves it abortable by [`DiscoveryCoordinator::load`].
    pub async fn join(&self, id: &str) -> Option<CityProcess> {
        let done = self.workers().get(id).map(|w| w.done.clone());
        if let Some(mut done) = done {
            if done.wait_for(|finished| *finished).await.is_err() {
                tracing::debug!(city = %id, "pipeline ended without finishing");
            }
        }
        self.registry.get(id)
    }

    /// A task that has published a settled status has nothing left to
    /// commit, so only a scanning city with a live task is busy.
    fn ensure_not_busy(
        workers: &HashMap<String, Worker>,
        id: &str,
        current: &CityProcess,
    ) -> Result<(), CoordinatorError> {
        let running = workers.get(id).is_some_and(Worker::is_running);
        if running && current.status.is_processing() {
            return Err(CoordinatorError::Busy(id.to_string()));
        }
        Ok(())
    }

    fn process_for(&self, id: &str) -> Result<CityDiscoveryProcess, CoordinatorError> {
        let snapshot = self
            .registry
            .get(id)
            .ok_or_else(|| CoordinatorError::UnknownCity(id.to_string()))?;
        Ok(CityDiscoveryProcess::from_snapshot(
            snapshot,
            CancelFlag::new(),
            self.registry.observer(),
        ))
    }

    fn workers(&self) -> MutexGuard<'_, HashMap<String, Worker>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
