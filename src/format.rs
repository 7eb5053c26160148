//! Human-readable renderings of derived metrics.

/// Formats a duration in seconds as `HH:MM:SS`. Hours are not wrapped,
/// so ages beyond 99 hours widen the first column.
pub fn elapsed_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Converts kilobytes to a megabyte string with two decimals.
///
/// The value is rendered with six decimals and the last four are cut off,
/// so it is truncated rather than rounded past the second decimal.
pub fn megabytes(kb: u64) -> String {
    let mb = kb as f64 * 0.001;
    let mut rendered = format!("{:.6}", mb);
    rendered.truncate(rendered.len() - 4);
    rendered
}

/// Renders a ratio in `[0, 1]` as a percentage, `n/a` when unavailable.
pub fn percent(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_time() {
        assert_eq!(elapsed_time(3661), "01:01:01");
        assert_eq!(elapsed_time(59), "00:00:59");
        assert_eq!(elapsed_time(0), "00:00:00");
        assert_eq!(elapsed_time(360_000), "100:00:00");
    }

    #[test]
    fn test_megabytes_truncates() {
        assert_eq!(megabytes(204800), "204.80");
        assert_eq!(megabytes(0), "0.00");
        assert_eq!(megabytes(1239), "1.23");
        assert_eq!(megabytes(5), "0.00");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(Some(0.5)), "50.0%");
        assert_eq!(percent(None), "n/a");
    }
}
