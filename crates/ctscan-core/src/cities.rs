//! CSV intake for the city list.
//!
//! The accepted format is deliberately narrow: comma-separated, no quoting,
//! a header row naming `city` and `population` in any position and case.
//! Rows that cannot be read are dropped silently; the file as a whole is
//! rejected only when nothing usable remains.

use std::path::Path;

use crate::error::IntakeError;
use crate::types::City;

/// Upper bound on the number of cities handed to discovery.
pub const MAX_CITIES: usize = 100;

/// Parse CSV text into the ranked city list.
///
/// The result is sorted by population, largest first (ties keep file
/// order), and truncated to [`MAX_CITIES`].
///
/// # Errors
///
/// - [`IntakeError::TooFewLines`] if fewer than two non-blank lines exist.
/// - [`IntakeError::MissingColumns`] if the header lacks `city` or `population`.
/// - [`IntakeError::NoValidRows`] if every data row was dropped.
pub fn parse_cities_csv(text: &str) -> Result<Vec<City>, IntakeError> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let Some((header, rows)) = lines.split_first() else {
        return Err(IntakeError::TooFewLines);
    };
    if rows.is_empty() {
        return Err(IntakeError::TooFewLines);
    }

    let columns: Vec<String> = header
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();
    let city_idx = columns.iter().position(|c| c == "city");
    let population_idx = columns.iter().position(|c| c == "population");
    let (Some(city_idx), Some(population_idx)) = (city_idx, population_idx) else {
        return Err(IntakeError::MissingColumns);
    };

    let mut cities: Vec<City> = rows
        .iter()
        .filter_map(|row| parse_row(row, city_idx, population_idx))
        .collect();

    if cities.is_empty() {
        return Err(IntakeError::NoValidRows);
    }

    cities.sort_by(|a, b| b.population.cmp(&a.population));
    cities.truncate(MAX_CITIES);

    Ok(cities)
}

/// Read a CSV file from disk and parse it with [`parse_cities_csv`].
///
/// # Errors
///
/// Returns [`IntakeError::Io`] if the file cannot be read, otherwise any
/// validation error from [`parse_cities_csv`].
pub fn load_cities(path: &Path) -> Result<Vec<City>, IntakeError> {
    let content = std::fs::read_to_string(path).map_err(|e| IntakeError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_cities_csv(&content)
}

fn parse_row(row: &str, city_idx: usize, population_idx: usize) -> Option<City> {
    let cells: Vec<&str> = row.split(',').collect();
    let name = cells.get(city_idx)?.trim();
    if name.is_empty() {
        return None;
    }
    let population = cells.get(population_idx)?.trim().parse::<u64>().ok()?;
    Some(City::new(name, population))
}

#[cfg(test)]
#[path = "cities_test.rs"]
mod tests;
