//! Prompt text and request assembly for the two discovery queries.

use ctscan_core::LocationCoords;

use crate::types::{
    GenerateContentRequest, GenerationConfig, LatLng, RetrievalConfig, Tool, ToolConfig,
};

/// Sampling temperature for pincode enumeration; low for repeatable lists.
pub const PINCODE_TEMPERATURE: f64 = 0.1;

#[must_use]
pub fn pincode_prompt(city: &str) -> String {
    format!(
        "Find all 6-digit postal pincodes for the city of {city}, India. \
         Return the result as a JSON object with a single key \"pincodes\" which is an array of strings. \
         For example: {{\"pincodes\": [\"110001\", \"110002\"]}}. \
         Provide only the raw JSON object."
    )
}

#[must_use]
pub fn centers_prompt(pincode: &str, city: &str) -> String {
    format!(
        "Find all CT scan centers, diagnostic scan centers, and private hospitals with CT scan \
         facilities located in or very near the postal pincode {pincode} in {city}, India. \
         For each, confirm CT scan availability. \
         Return the results as a JSON array of objects. Each object should have the following keys: \
         \"name\", \"address\", \"pincode\", \"contactNumber\", \"googleRating\", \"mapLink\", \
         \"website\", \"ctAvailable\". \
         Provide only the raw JSON array. If no centers are found, return an empty array."
    )
}

/// Search-grounded pincode request.
#[must_use]
pub fn pincode_request(city: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        tools: vec![Tool::GoogleSearch {}],
        generation_config: Some(GenerationConfig {
            temperature: PINCODE_TEMPERATURE,
        }),
        ..GenerateContentRequest::from_prompt(pincode_prompt(city))
    }
}

/// Maps-grounded center request, biased towards `location` when given.
///
/// Structured-output settings are not sent because the Maps tool rejects
/// them; the prompt asks for JSON instead.
#[must_use]
pub fn centers_request(
    pincode: &str,
    city: &str,
    location: Option<LocationCoords>,
) -> GenerateContentRequest {
    GenerateContentRequest {
        tools: vec![Tool::GoogleMaps {}],
        tool_config: location.map(|loc| ToolConfig {
            retrieval_config: RetrievalConfig {
                lat_lng: LatLng {
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                },
            },
        }),
        ..GenerateContentRequest::from_prompt(centers_prompt(pincode, city))
    }
}
