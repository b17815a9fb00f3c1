//! Human-readable time formatting
//!
//! Consistent elapsed/remaining time display for progress views.

/// Seconds in one minute
const MINUTE: u64 = 60;
/// Seconds in one hour
const HOUR: u64 = 3600;

/// Format elapsed seconds as a clock reading.
///
/// - Below one hour: `M:SS`
/// - One hour or more: `H:MM:SS`
///
/// # Examples
///
/// ```
/// use vidshield_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(0), "0:00");
/// assert_eq!(format_elapsed(75), "1:15");
/// assert_eq!(format_elapsed(3661), "1:01:01");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / HOUR;
    let mins = (seconds % HOUR) / MINUTE;
    let secs = seconds % MINUTE;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format a remaining-time estimate.
///
/// - Below one minute: `Ns`
/// - Otherwise: `Mm SSs`
///
/// # Examples
///
/// ```
/// use vidshield_common::human_time::format_remaining;
///
/// assert_eq!(format_remaining(42), "42s");
/// assert_eq!(format_remaining(185), "3m 05s");
/// ```
pub fn format_remaining(seconds: u64) -> String {
    if seconds < MINUTE {
        format!("{}s", seconds)
    } else {
        format!("{}m {:02}s", seconds / MINUTE, seconds % MINUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_minute_boundary() {
        assert_eq!(format_elapsed(59), "0:59");
        assert_eq!(format_elapsed(60), "1:00");
        assert_eq!(format_elapsed(3599), "59:59");
        assert_eq!(format_elapsed(3600), "1:00:00");
    }

    #[test]
    fn test_remaining_minute_boundary() {
        assert_eq!(format_remaining(0), "0s");
        assert_eq!(format_remaining(59), "59s");
        assert_eq!(format_remaining(60), "1m 00s");
        // Long estimates stay in minutes
        assert_eq!(format_remaining(7265), "121m 05s");
    }
}
