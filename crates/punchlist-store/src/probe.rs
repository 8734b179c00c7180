// ABOUTME: Capability probe for the durable storage backend.
// ABOUTME: Decides whether a file-backed database can be opened at a given path, without side effects.

use std::path::Path;

/// Check whether the durable backend can plausibly host a database file at
/// `path`. True only if the path has a parent directory that exists and the
/// path itself is not already a directory. Never errors; any missing
/// prerequisite yields false. This is the sole gate for choosing durable vs.
/// volatile mode and is called exactly once per bootstrap attempt.
pub fn probe_durable_storage_support(path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        tracing::debug!("durable storage probe: {} has no parent", path.display());
        return false;
    };

    // A bare filename has an empty parent, which means the working directory.
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let supported = parent.is_dir() && !path.is_dir();
    tracing::debug!(
        "durable storage probe for {}: {}",
        path.display(),
        supported
    );
    supported
}
