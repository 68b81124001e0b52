//! Scripted lookups and a recording observer for state-machine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ctscan_core::{LocationCoords, ScanCenter};
use tokio::sync::Notify;

use crate::contracts::{CenterFinder, PincodeResolver, ResolveError};
use crate::process::{CityProcess, ProcessObserver};

pub(crate) fn center(name: &str) -> ScanCenter {
    ScanCenter {
        name: name.to_string(),
        address: format!("{name} Road"),
        ..ScanCenter::default()
    }
}

pub(crate) fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

/// Returns a fixed answer, optionally waiting on a gate first.
pub(crate) struct FakeResolver {
    answer: Result<Vec<String>, ResolveError>,
    gate: Option<Arc<Notify>>,
    pub(crate) calls: AtomicUsize,
}

impl FakeResolver {
    pub(crate) fn ok(list: &[&str]) -> Self {
        Self {
            answer: Ok(codes(list)),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn err(err: ResolveError) -> Self {
        Self {
            answer: Err(err),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl PincodeResolver for FakeResolver {
    async fn resolve(&self, _city: &str) -> Result<Vec<String>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.answer.clone()
    }
}

/// Per-pincode scripted centers; unknown pincodes yield nothing. An optional
/// gate is awaited before every lookup.
#[derive(Default)]
pub(crate) struct FakeFinder {
    centers: HashMap<String, Vec<ScanCenter>>,
    gate: Option<Arc<Notify>>,
    pub(crate) entered: AtomicUsize,
    pub(crate) seen: Mutex<Vec<(String, Option<LocationCoords>)>>,
}

impl FakeFinder {
    pub(crate) fn with(mut self, pincode: &str, names: &[&str]) -> Self {
        self.centers
            .insert(pincode.to_string(), names.iter().map(|n| center(n)).collect());
        self
    }

    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn seen_pincodes(&self) -> Vec<String> {
        self.seen
            .lock()
            .expect("lock")
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl CenterFinder for FakeFinder {
    async fn find(
        &self,
        pincode: &str,
        _city: &str,
        location: Option<LocationCoords>,
    ) -> Vec<ScanCenter> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.seen
            .lock()
            .expect("lock")
            .push((pincode.to_string(), location));
        self.centers.get(pincode).cloned().unwrap_or_default()
    }
}

/// Records every published snapshot.
#[derive(Default)]
pub(crate) struct Recorder(Mutex<Vec<CityProcess>>);

impl Recorder {
    pub(crate) fn updates(&self) -> Vec<CityProcess> {
        self.0.lock().expect("lock").clone()
    }
}

impl ProcessObserver for Recorder {
    fn on_update(&self, snapshot: &CityProcess) {
        self.0.lock().expect("lock").push(snapshot.clone());
    }
}
