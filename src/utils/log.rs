// src/utils/log.rs

//! Formatting helpers layered on the `log` facade.
//!
//! Levels and timestamps come from whatever logger the binary installs; these
//! helpers only shape multi-line blocks consistently.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
