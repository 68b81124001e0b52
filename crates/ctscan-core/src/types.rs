//! Domain records shared by the discovery pipeline and its surfaces.

use serde::{Deserialize, Deserializer, Serialize};

use scalar::Scalar;

/// A city row accepted from an uploaded list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub population: u64,
}

impl City {
    #[must_use]
    pub fn new(name: impl Into<String>, population: u64) -> Self {
        Self {
            name: name.into(),
            population,
        }
    }
}

/// Optional geographic bias forwarded to center lookups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationCoords {
    pub latitude: f64,
    pub longitude: f64,
}

/// A CT-scan facility as reported by the generative search API.
///
/// Model output is loosely typed, so every field tolerates `null`, missing
/// keys, and the common string-encoded forms of numbers and booleans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCenter {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pincode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_number: String,
    /// Star rating; `0.0` when absent or unreadable.
    #[serde(default, deserialize_with = "lenient_rating")]
    pub google_rating: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub map_link: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub ct_available: bool,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match value {
        Some(Scalar::Str(s)) => s,
        Some(Scalar::Num(n)) => {
            // Pincodes and phone numbers are sometimes emitted unquoted.
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{n:.0}")
            } else {
                n.to_string()
            }
        }
        Some(Scalar::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}

fn lenient_rating<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    let rating = match value {
        Some(Scalar::Num(n)) => n,
        Some(Scalar::Str(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Scalar::Bool(_)) | None => 0.0,
    };
    Ok(if rating.is_finite() && rating > 0.0 {
        rating
    } else {
        0.0
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match value {
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Str(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        Some(Scalar::Num(_)) | None => false,
    })
}

mod scalar {
    use serde::Deserialize;

    /// Any JSON scalar; objects and arrays are rejected by the untagged match.
    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Scalar {
        Bool(bool),
        Num(f64),
        Str(String),
    }
}
