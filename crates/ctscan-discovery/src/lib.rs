//! Per-city CT-scan center discovery.
//!
//! Each city moves through an explicit state machine
//! ([`CityDiscoveryProcess`]): pincode discovery, user confirmation, then a
//! sequential per-pincode center scan. Every transition publishes a full
//! [`CityProcess`] snapshot to a [`ProcessObserver`]; the
//! [`SharedRegistry`] is the observer used by both surfaces, and the
//! [`DiscoveryCoordinator`] runs one task per active city on top of it.

pub mod cancel;
pub mod contracts;
pub mod coordinator;
pub mod gemini;
pub mod process;
pub mod registry;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::CancelFlag;
pub use contracts::{CenterFinder, PincodeResolver, ResolveError};
pub use coordinator::{CoordinatorError, DiscoveryCoordinator};
pub use process::{
    CityDiscoveryProcess, CityProcess, ProcessObserver, TransitionError, Trigger,
    NO_PINCODES_MESSAGE,
};
pub use registry::{ProcessRegistry, SharedRegistry};
pub use status::ProcessStatus;
