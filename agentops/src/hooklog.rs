//! Hook failure log — `.agents/ao/hook-errors.log`.
//!
//! Hooks fail open: a blocking gate writes one line to stderr and exits 2;
//! everything else lands here as `YYYY-MM-DDTHH:MM:SSZ HOOK_FAIL: <msg>`
//! and the hook exits 0.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::warn;

use crate::layout::AgentsLayout;

/// Exit code a blocking hook uses when a gate refuses progression.
pub const EXIT_GATE_BLOCKED: i32 = 2;

/// Append one failure line for `base`'s log.
pub fn log_hook_failure(base: impl AsRef<Path>, message: &str) -> std::io::Result<()> {
    let path = AgentsLayout::new(base).hook_errors_log();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let stamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    writeln!(file, "{stamp} HOOK_FAIL: {message}")
}

/// Fail-open variant: swallow logging errors so a broken log file can never
/// block a hook.
pub fn log_hook_failure_fail_open(base: impl AsRef<Path>, message: &str) {
    if let Err(e) = log_hook_failure(base, message) {
        warn!(error = %e, "hook failure log unwritable");
    }
}
