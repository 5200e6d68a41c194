//! Human-readable byte formatting
//!
//! Pure presentation helper; has no bearing on ledger correctness.

/// Format a byte count as `B`/`KB`/`MB`/`GB`/`TB`, dividing by 1024 per step
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}
