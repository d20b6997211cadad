// SPDX-License-Identifier: MIT

//! Human-readable duration formatting for logs and banners.

use std::time::Duration;

/// Format a duration as `"1h2m3s"`, dropping leading zero components.
pub fn format_elapsed(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Format a millisecond duration the same way as [`format_elapsed`].
pub fn format_elapsed_ms(ms: u64) -> String {
    format_elapsed(Duration::from_millis(ms))
}
