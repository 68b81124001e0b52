//! The per-city discovery state machine.
//!
//! ```text
//! Idle --start--> ScanningPincodes --(codes)--> AwaitingConfirmation
//!                        |                          |         |
//!                     (none/err)                 reject    confirm
//!                        v                          v         v
//!                      Error                      Idle   ScanningCenters
//!                                                             |
//!                                                 Completed / Stopped
//! ```
//!
//! Operations are split into a synchronous `begin_*` step that validates the
//! trigger and publishes the first transition, and an async `run_*` step that
//! performs the lookups. Callers that spawn the lookup onto a task use the
//! split form so the first transition is visible before the call returns.

use std::collections::HashSet;
use std::sync::Arc;

use ctscan_core::{City, LocationCoords, ScanCenter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::CancelFlag;
use crate::contracts::{CenterFinder, PincodeResolver};
use crate::status::ProcessStatus;

/// Error message recorded when a resolver returns no codes at all.
pub const NO_PINCODES_MESSAGE: &str = "No pincodes found for this city.";

/// Full, self-contained snapshot of one city's discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityProcess {
    /// Equal to the city name.
    pub id: String,
    pub name: String,
    pub population: u64,
    pub status: ProcessStatus,
    /// Unique codes in discovery order.
    pub pincodes: Vec<String>,
    /// Cumulative, in pincode scan order.
    pub centers: Vec<ScanCenter>,
    pub found_pincodes_count: usize,
    pub scanned_pincodes_count: usize,
    pub error_message: Option<String>,
}

impl CityProcess {
    #[must_use]
    pub fn idle(city: &City) -> Self {
        Self {
            id: city.name.clone(),
            name: city.name.clone(),
            population: city.population,
            status: ProcessStatus::Idle,
            pincodes: Vec::new(),
            centers: Vec::new(),
            found_pincodes_count: 0,
            scanned_pincodes_count: 0,
            error_message: None,
        }
    }

    /// Fraction of found pincodes already scanned, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.found_pincodes_count == 0 {
            return 0.0;
        }
        self.scanned_pincodes_count as f64 / self.found_pincodes_count as f64
    }

    /// Short human-readable description of the current state.
    #[must_use]
    pub fn status_text(&self) -> String {
        match self.status {
            ProcessStatus::Idle => "Ready to start".to_string(),
            ProcessStatus::ScanningPincodes => "Scanning pincodes...".to_string(),
            ProcessStatus::AwaitingConfirmation => {
                format!("{} pincodes found", self.found_pincodes_count)
            }
            ProcessStatus::ScanningCenters => format!("Found {} centers", self.centers.len()),
            ProcessStatus::Completed => {
                format!("Completed. Found {} centers.", self.centers.len())
            }
            ProcessStatus::Stopped => "Stopped by user".to_string(),
            ProcessStatus::Error => "An error occurred".to_string(),
        }
    }

    fn clear_results(&mut self) {
        self.pincodes.clear();
        self.centers.clear();
        self.found_pincodes_count = 0;
        self.scanned_pincodes_count = 0;
        self.error_message = None;
    }
}

/// Receives every snapshot a process publishes, in order.
pub trait ProcessObserver: Send + Sync {
    fn on_update(&self, snapshot: &CityProcess);
}

impl<F> ProcessObserver for F
where
    F: Fn(&CityProcess) + Send + Sync,
{
    fn on_update(&self, snapshot: &CityProcess) {
        self(snapshot);
    }
}

/// User-facing actions on a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Stop,
    Confirm,
    Reject,
    Reset,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Confirm => "confirm",
            Self::Reject => "reject",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {trigger} a city that is {from}")]
    InvalidTrigger { from: ProcessStatus, trigger: Trigger },
}

/// Drives one city's snapshot through the state machine.
pub struct CityDiscoveryProcess {
    state: CityProcess,
    cancel: CancelFlag,
    observer: Arc<dyn ProcessObserver>,
}

impl std::fmt::Debug for CityDiscoveryProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityDiscoveryProcess")
            .field("state", &self.state)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl CityDiscoveryProcess {
    /// A fresh idle process for `city`.
    #[must_use]
    pub fn new(city: &City, observer: Arc<dyn ProcessObserver>) -> Self {
        Self::from_snapshot(CityProcess::idle(city), CancelFlag::new(), observer)
    }

    /// Resume driving an existing snapshot.
    #[must_use]
    pub fn from_snapshot(
        state: CityProcess,
        cancel: CancelFlag,
        observer: Arc<dyn ProcessObserver>,
    ) -> Self {
        Self {
            state,
            cancel,
            observer,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &CityProcess {
        &self.state
    }

    #[must_use]
    pub fn into_snapshot(self) -> CityProcess {
        self.state
    }

    /// Handle for requesting a stop while a scan is running.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Discover pincodes. Valid only from `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTrigger`] from any other state.
    pub async fn start(&mut self, resolver: &dyn PincodeResolver) -> Result<(), TransitionError> {
        self.begin_start()?;
        self.run_pincode_scan(resolver).await;
        Ok(())
    }

    /// Validate `start` and enter `ScanningPincodes`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTrigger`] unless the city is `Idle`.
    pub fn begin_start(&mut self) -> Result<(), TransitionError> {
        self.require(Trigger::Start, &[ProcessStatus::Idle])?;
        self.cancel.clear();
        self.commit(|s| {
            s.clear_results();
            s.status = ProcessStatus::ScanningPincodes;
        });
        Ok(())
    }

    /// Resolve the city's pincodes. No-op unless `begin_start` succeeded.
    pub async fn run_pincode_scan(&mut self, resolver: &dyn PincodeResolver) {
        if self.state.status != ProcessStatus::ScanningPincodes {
            return;
        }
        let city = self.state.name.clone();
        let result = resolver.resolve(&city).await;

        if self.cancel.is_cancelled() {
            tracing::info!(city = %city, "pincode scan stopped; discarding result");
            self.commit(|s| s.status = ProcessStatus::Stopped);
            return;
        }

        match result {
            Ok(codes) => {
                let codes = dedupe(codes);
                if codes.is_empty() {
                    tracing::warn!(city = %city, "no pincodes found");
                    self.commit(|s| {
                        s.status = ProcessStatus::Error;
                        s.error_message = Some(NO_PINCODES_MESSAGE.to_string());
                    });
                } else {
                    tracing::info!(city = %city, count = codes.len(), "pincodes found");
                    self.commit(|s| {
                        s.found_pincodes_count = codes.len();
                        s.pincodes = codes;
                        s.status = ProcessStatus::AwaitingConfirmation;
                    });
                }
            }
            Err(e) => {
                tracing::error!(city = %city, error = %e, "pincode scan failed");
                self.commit(|s| {
                    s.status = ProcessStatus::Error;
                    s.error_message = Some(e.to_string());
                });
            }
        }
    }

    /// Discard the found pincodes and return to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTrigger`] unless the city is
    /// `AwaitingConfirmation`.
    pub fn reject(&mut self) -> Result<(), TransitionError> {
        self.require(Trigger::Reject, &[ProcessStatus::AwaitingConfirmation])?;
        self.commit(|s| {
            s.clear_results();
            s.status = ProcessStatus::Idle;
        });
        Ok(())
    }

    /// Scan every found pincode for centers, in order.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTrigger`] unless the city is
    /// `AwaitingConfirmation`.
    pub async fn confirm(
        &mut self,
        finder: &dyn CenterFinder,
        location: Option<LocationCoords>,
    ) -> Result<(), TransitionError> {
        self.begin_confirm()?;
        self.run_center_scan(finder, location).await;
        Ok(())
    }

    /// Validate `confirm` and enter `ScanningCenters`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTrigger`] unless the city is
    /// `AwaitingConfirmation`.
    pub fn begin_confirm(&mut self) -> Result<(), TransitionError> {
        self.require(Trigger::Confirm, &[ProcessStatus::AwaitingConfirmation])?;
        self.cancel.clear();
        self.commit(|s| s.status = ProcessStatus::ScanningCenters);
        Ok(())
    }

    /// Query each pincode in turn. No-op unless `begin_confirm` succeeded.
    pub async fn run_center_scan(
        &mut self,
        finder: &dyn CenterFinder,
        location: Option<LocationCoords>,
    ) {
        if self.state.status != ProcessStatus::ScanningCenters {
            return;
        }
        let city = self.state.name.clone();
        let pincodes = self.state.pincodes.clone();

        for pincode in &pincodes {
            if self.cancel.is_cancelled() {
                break;
            }
            let found = finder.find(pincode, &city, location).await;
            tracing::debug!(city = %city, pincode = %pincode, count = found.len(), "pincode scanned");
            self.commit(|s| {
                s.centers.extend(found);
                s.scanned_pincodes_count += 1;
            });
        }

        if self.cancel.is_cancelled() {
            tracing::info!(
                city = %city,
                scanned = self.state.scanned_pincodes_count,
                centers = self.state.centers.len(),
                "center scan stopped"
            );
            self.commit(|s| s.status = ProcessStatus::Stopped);
        } else {
            tracing::info!(city = %city, centers = self.state.centers.len(), "center scan completed");
            self.commit(|s| s.status = ProcessStatus::Completed);
        }
    }

    /// Return a finished, failed, or stopped city to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidTrigger`] from any non-terminal
    /// state.
    pub fn reset(&mut self) -> Result<(), TransitionError> {
        self.require(
            Trigger::Reset,
            &[
                ProcessStatus::Completed,
                ProcessStatus::Error,
                ProcessStatus::Stopped,
            ],
        )?;
        self.cancel.clear();
        self.commit(|s| {
            s.clear_results();
            s.status = ProcessStatus::Idle;
        });
        Ok(())
    }

    fn require(&self, trigger: Trigger, allowed: &[ProcessStatus]) -> Result<(), TransitionError> {
        if allowed.contains(&self.state.status) {
            Ok(())
        } else {
            Err(TransitionError::InvalidTrigger {
                from: self.state.status,
                trigger,
            })
        }
    }

    fn commit(&mut self, change: impl FnOnce(&mut CityProcess)) {
        change(&mut self.state);
        debug_assert!(self.state.scanned_pincodes_count <= self.state.found_pincodes_count);
        self.observer.on_update(&self.state);
    }
}

/// Order-preserving dedupe.
fn dedupe(codes: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

#[cfg(test)]
#[path = "process_test.rs"]
mod tests;
