//! Upload storage and housekeeping.
//!
//! Uploaded reports live in the data directory as
//! `blood_test_report_{id}.pdf` until their analysis finishes. Anything left
//! behind (crashed workers, abandoned jobs) is swept once it is older than
//! the configured age.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const UPLOAD_PREFIX: &str = "blood_test_report_";
const UPLOAD_SUFFIX: &str = ".pdf";

/// Path an upload with `id` is stored at.
pub fn upload_path(data_dir: &Path, id: &str) -> PathBuf {
    data_dir.join(format!("{UPLOAD_PREFIX}{id}{UPLOAD_SUFFIX}"))
}

fn is_upload_name(name: &str) -> bool {
    name.starts_with(UPLOAD_PREFIX) && name.ends_with(UPLOAD_SUFFIX)
}

/// Remove a stored upload, ignoring files that are already gone.
pub async fn remove_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove upload"),
    }
}

/// Delete uploads in `data_dir` last modified more than `max_age` ago.
///
/// Returns how many files were removed. A missing directory counts as empty.
pub fn cleanup_old_files(data_dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0;

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_upload_name(name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::now());
        if modified < cutoff {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = name, error = %e, "Failed to remove stale upload"),
            }
        }
    }

    if removed > 0 {
        info!(removed, dir = %data_dir.display(), "Cleaned up stale uploads");
    }
    Ok(removed)
}

/// Run [`cleanup_old_files`] every `interval` until `shutdown` flips to true.
pub fn spawn_sweeper(
    data_dir: PathBuf,
    max_age: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dir = data_dir.clone();
                    let result =
                        tokio::task::spawn_blocking(move || cleanup_old_files(&dir, max_age)).await;
                    match result {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => warn!(error = %e, "Upload sweep failed"),
                        Err(e) => warn!(error = %e, "Upload sweep panicked"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Upload sweeper stopping");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age(path: &Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn test_upload_path() {
        let path = upload_path(Path::new("data"), "abc");
        assert_eq!(path, PathBuf::from("data/blood_test_report_abc.pdf"));
    }

    #[test]
    fn test_cleanup_removes_only_old_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let old = upload_path(dir.path(), "old");
        let fresh = upload_path(dir.path(), "fresh");
        let other = dir.path().join("sample.pdf");
        for p in [&old, &fresh, &other] {
            std::fs::write(p, b"%PDF-1.4").unwrap();
        }
        age(&old, Duration::from_secs(2 * 60 * 60));
        age(&other, Duration::from_secs(2 * 60 * 60));

        let removed = cleanup_old_files(dir.path(), Duration::from_secs(60 * 60)).unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(cleanup_old_files(&missing, Duration::ZERO).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_upload_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = upload_path(dir.path(), "gone");
        remove_upload(&path).await;
        std::fs::write(&path, b"x").unwrap();
        remove_upload(&path).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = spawn_sweeper(
            dir.path().to_path_buf(),
            Duration::from_secs(60),
            Duration::from_millis(10),
            rx,
        );
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
