//! The two external lookups a discovery pipeline depends on.

use async_trait::async_trait;
use ctscan_core::{LocationCoords, ScanCenter};
use thiserror::Error;

/// Why a city's pincodes could not be resolved.
///
/// The display strings are shown to the user as the city's error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The service answered, but nothing in the answer reads as a pincode.
    #[error("Failed to parse pincodes from Gemini API response.")]
    Unparseable,

    /// The query itself failed. `reason` is kept for logs only.
    #[error("Failed to fetch pincodes from Gemini API.")]
    Unavailable { reason: String },
}

/// Enumerates the postal codes of a city.
#[async_trait]
pub trait PincodeResolver: Send + Sync {
    /// Six-digit codes for `city`. An empty list is a valid answer and is
    /// distinct from an error.
    async fn resolve(&self, city: &str) -> Result<Vec<String>, ResolveError>;
}

/// Looks up scan centers for one postal code.
#[async_trait]
pub trait CenterFinder: Send + Sync {
    /// Never fails: a failed query yields an empty list so one bad pincode
    /// cannot halt a city's scan.
    async fn find(
        &self,
        pincode: &str,
        city: &str,
        location: Option<LocationCoords>,
    ) -> Vec<ScanCenter>;
}
