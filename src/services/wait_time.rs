//! Human-readable wait times.

/// Format whole minutes spent in the queue.
///
/// `0` reads "Less than a minute"; hours and minutes are pluralized
/// independently, and a zero minute part is omitted ("2 hours").
pub fn format_wait_time(minutes: u64) -> String {
    if minutes == 0 {
        return "Less than a minute".to_string();
    }

    let hours = minutes / 60;
    let rest = minutes % 60;

    match (hours, rest) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
