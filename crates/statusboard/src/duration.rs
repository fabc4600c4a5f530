//! Human readable durations for downtime badges.

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

fn plural(count: u64, unit: &str) -> String {
    if count == 1 { format!("{count} {unit}") } else { format!("{count} {unit}s") }
}

/// Format a number of seconds the way the dashboard shows downtime
///
/// ```
/// use statusboard::format_duration;
///
/// assert_eq!(format_duration(45), "45 seconds");
/// assert_eq!(format_duration(125), "2 minutes");
/// assert_eq!(format_duration(3700), "1 hour 1 min");
/// ```
pub fn format_duration(seconds: u64) -> String {
    if seconds < MINUTE {
        format!("{seconds} seconds")
    } else if seconds < HOUR {
        plural(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        let hours = plural(seconds / HOUR, "hour");
        match (seconds % HOUR) / MINUTE {
            0 => hours,
            minutes => format!("{hours} {minutes} min"),
        }
    } else {
        let days = plural(seconds / DAY, "day");
        match (seconds % DAY) / HOUR {
            0 => days,
            hours => format!("{days} {hours} hr"),
        }
    }
}
