//! Output formatting helpers for log lines and the run summary.

use crate::generator::ReleaseReport;

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Render a byte count with one decimal place and a 1024-based unit.
///
/// # Examples
///
/// ```
/// use addon_repo::output::human_size;
///
/// assert_eq!(human_size(512), "512.0 B");
/// assert_eq!(human_size(1536), "1.5 KB");
/// ```
#[must_use]
pub fn human_size(bytes: u64) -> String {
    let scaled = u128::from(bytes) * 10;
    let mut unit_index = 0;
    let mut divisor: u128 = 1;
    // Promote to the next unit once the rounded value would reach 1024.
    while unit_index + 1 < UNITS.len() && scaled >= divisor * 10_240 - divisor.div_euclid(2) {
        divisor *= 1024;
        unit_index += 1;
    }

    let tenths = (scaled + divisor.div_euclid(2)).div_euclid(divisor);
    let unit = UNITS.get(unit_index).copied().unwrap_or("B");
    format!("{}.{} {unit}", tenths.div_euclid(10), tenths.rem_euclid(10))
}

/// Render an error followed by each of its sources on one line.
#[must_use]
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Render the one-line summary printed for a release after it finishes.
#[must_use]
pub fn release_summary(report: &ReleaseReport) -> String {
    let changed = report.changed_count();
    let failed = report.failures().len();
    let state = if report.catalog_written() {
        "catalog updated"
    } else {
        "catalog unchanged"
    };
    format!(
        "{}: {} package(s), {changed} changed, {failed} failed, {state}",
        report.release_root(),
        report.outcomes().len() + failed,
    )
}
