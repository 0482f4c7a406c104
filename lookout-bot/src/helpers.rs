use std::time::Duration;

/// Render an elapsed duration as `Xm Ys`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Discord relative timestamp markup, e.g. "5 minutes ago".
pub fn relative_time(unix: i64) -> String {
    format!("<t:{}:R>", unix)
}
