pub mod ai;
pub mod chat;
pub mod conversations;
pub mod documents;
pub mod estimate;
pub mod files;
pub mod keys;
pub mod knowledge;
pub mod projects;

use chrono::{DateTime, Local, Utc};

pub(crate) fn format_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// First `max` characters of `text` on one line, with an ellipsis when cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        format!("{}…", flat.chars().take(max).collect::<String>())
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("Add a\nlogin   page", 40), "Add a login page");
        assert_eq!(preview("abcdefgh", 3), "abc…");
    }
}
