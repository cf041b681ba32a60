//! Formatting utilities for dashboard display.

const KIB: f64 = 1024.0;
const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count with binary units.
///
/// Bytes are shown as an integer, larger units with one decimal place.
///
/// ```text
/// format_size(0)    == "0 B"
/// format_size(1536) == "1.5 KB"
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / KIB;
    let mut unit = 0;
    // compare the displayed value so 1023.96 KB shows as 1.0 MB
    while round_tenth(value) >= KIB && unit < UNITS.len() - 1 {
        value /= KIB;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
