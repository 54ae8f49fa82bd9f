//! Time formatting helpers.

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Format a nanosecond duration (as stored in governance parameters).
///
/// Sub-second remainders are dropped except for durations shorter than a second.
pub fn format_duration_ns(nanos: u64) -> String {
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", nanos / 1_000_000);
    }
    format_duration(nanos / NANOS_PER_SEC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_scale() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
        assert_eq!(format_duration(90000), "1d 1h");
    }

    #[test]
    fn formats_nanoseconds() {
        assert_eq!(format_duration_ns(15_000_000_000), "15s");
        assert_eq!(format_duration_ns(250_000_000), "250ms");
    }
}
