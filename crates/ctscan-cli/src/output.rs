//! Plain-text rendering for terminal output.

use ctscan_core::{City, ScanCenter};
use ctscan_discovery::{CityProcess, ProcessStatus};

pub(crate) fn print_cities(cities: &[City]) {
    for (rank, city) in cities.iter().enumerate() {
        println!("{:>3}. {:<30} {:>12}", rank + 1, city.name, city.population);
    }
}

pub(crate) fn print_centers(centers: &[ScanCenter]) {
    if centers.is_empty() {
        println!("No centers found.");
        return;
    }
    for center in centers {
        println!("{}", format_center(center));
    }
}

pub(crate) fn format_center(center: &ScanCenter) -> String {
    let mut out = format!("{}\n  {}", center.name, center.address);
    if !center.pincode.is_empty() {
        out.push_str(&format!(" ({})", center.pincode));
    }
    out.push_str(&format!(
        "\n  CT: {}  rating: {:.1}",
        if center.ct_available { "yes" } else { "no" },
        center.google_rating
    ));
    if !center.contact_number.is_empty() {
        out.push_str(&format!("  phone: {}", center.contact_number));
    }
    if !center.map_link.is_empty() {
        out.push_str(&format!("\n  map: {}", center.map_link));
    }
    if !center.website.is_empty() {
        out.push_str(&format!("\n  web: {}", center.website));
    }
    out
}

/// One line per city, e.g. `Pune: Completed. Found 3 centers. (2/2 pincodes)`.
pub(crate) fn summary_line(process: &CityProcess) -> String {
    match process.status {
        ProcessStatus::Error => format!(
            "{}: {}: {}",
            process.name,
            process.status_text(),
            process.error_message.as_deref().unwrap_or("unknown error")
        ),
        ProcessStatus::Idle => format!("{}: not scanned", process.name),
        _ => format!(
            "{}: {} ({}/{} pincodes)",
            process.name,
            process.status_text(),
            process.scanned_pincodes_count,
            process.found_pincodes_count
        ),
    }
}

pub(crate) fn print_report(processes: &[CityProcess]) {
    for process in processes {
        println!("{}", summary_line(process));
        for center in &process.centers {
            for line in format_center(center).lines() {
                println!("    {line}");
            }
        }
    }
}
