//! Human-readable byte counts.

/// Format a byte count as a human-readable string.
///
/// Exact multiples use the largest fitting unit; anything else is rounded
/// to one decimal.
///
/// # Examples
///
/// ```
/// use regioncache::config::format_size;
///
/// assert_eq!(format_size(1024), "1KB");
/// assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2GB");
/// assert_eq!(format_size(1536), "1.5KB");
/// assert_eq!(format_size(1000), "1000B");
/// ```
pub fn format_size(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    let (unit, name) = if bytes >= GB {
        (GB, "GB")
    } else if bytes >= MB {
        (MB, "MB")
    } else if bytes >= KB {
        (KB, "KB")
    } else {
        return format!("{}B", bytes);
    };

    if bytes % unit == 0 {
        format!("{}{}", bytes / unit, name)
    } else {
        format!("{:.1}{}", bytes as f64 / unit as f64, name)
    }
}
