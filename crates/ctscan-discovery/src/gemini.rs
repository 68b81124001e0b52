//! Gemini-backed implementations of the discovery contracts.

use async_trait::async_trait;
use ctscan_core::{LocationCoords, ScanCenter};
use ctscan_gemini::{GeminiClient, GeminiError};

use crate::contracts::{CenterFinder, PincodeResolver, ResolveError};

impl From<GeminiError> for ResolveError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::UnparseablePincodes => ResolveError::Unparseable,
            other => ResolveError::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl PincodeResolver for GeminiClient {
    async fn resolve(&self, city: &str) -> Result<Vec<String>, ResolveError> {
        self.find_pincodes(city).await.map_err(|e| {
            tracing::error!(city, error = %e, "pincode lookup failed");
            ResolveError::from(e)
        })
    }
}

#[async_trait]
impl CenterFinder for GeminiClient {
    async fn find(
        &self,
        pincode: &str,
        city: &str,
        location: Option<LocationCoords>,
    ) -> Vec<ScanCenter> {
        match self.find_scan_centers(pincode, city, location).await {
            Ok(centers) => centers,
            Err(e) => {
                tracing::warn!(
                    city,
                    pincode,
                    error = %e,
                    "center lookup failed; treating pincode as empty"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_maps_to_parse_message() {
        let err = ResolveError::from(GeminiError::UnparseablePincodes);
        assert_eq!(err, ResolveError::Unparseable);
        assert_eq!(
            err.to_string(),
            "Failed to parse pincodes from Gemini API response."
        );
    }

    #[test]
    fn other_errors_map_to_fetch_message() {
        let err = ResolveError::from(GeminiError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert!(matches!(err, ResolveError::Unavailable { ref reason } if reason.contains("boom")));
        assert_eq!(err.to_string(), "Failed to fetch pincodes from Gemini API.");
    }
}
