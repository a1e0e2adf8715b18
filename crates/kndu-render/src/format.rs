use chrono::{DateTime, Utc};

/// Format the time since `created` the way kubectl prints ages
///
/// Ages below two minutes are shown in seconds, below two hours in minutes,
/// below two days in hours, and in days after that.
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "<unknown>".to_string();
    };

    let secs = (now - created).num_seconds().max(0);
    match secs {
        s if s < 120 => format!("{s}s"),
        s if s < 2 * 3600 => format!("{}m", s / 60),
        s if s < 48 * 3600 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}

/// Format an allocatable/capacity pair as `alloc/cap`
pub fn format_resource(allocatable: Option<&str>, capacity: Option<&str>) -> String {
    match (allocatable, capacity) {
        (None, None) => "<none>".to_string(),
        (alloc, cap) => format!("{}/{}", alloc.unwrap_or("-"), cap.unwrap_or("-")),
    }
}
