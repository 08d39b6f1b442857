// Shared helpers for request validation and display formatting

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Usernames and category names: letters, digits and underscores
pub static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]+$").expect("identifier pattern is valid")
});

/// Image extensions accepted for avatar uploads
pub const AVATAR_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Relative "time ago" label shown next to posts and comments
pub fn format_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - created_at;
    let days = diff.num_days();
    let seconds = diff.num_seconds() - days * 86_400;

    if days > 0 {
        plural(days, "day")
    } else if seconds > 3600 {
        plural(seconds / 3600, "hour")
    } else if seconds > 60 {
        plural(seconds / 60, "minute")
    } else {
        "Just now".to_string()
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// Lowercased extension of an uploaded file name, if it is an allowed image type
pub fn avatar_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    AVATAR_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// First `max_chars` characters followed by "..." when the text is longer
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
