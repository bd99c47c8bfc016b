use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Directory of generated QR images, one file per ticket
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: usize,
    pub failed: usize,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticket_id: i32) -> PathBuf {
        self.dir.join(format!("ticket_{}_qr.png", ticket_id))
    }

    pub async fn write(&self, ticket_id: i32, png: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(ticket_id);
        fs::write(&path, png).await?;
        Ok(path)
    }

    /// `None` when the file is gone
    pub async fn read(&self, path: impl AsRef<Path>) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Best-effort removal of a single ticket's image
    pub async fn discard(&self, ticket_id: i32) {
        let path = self.path_for(ticket_id);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to discard QR artifact");
            }
        }
    }

    /// Delete every ticket QR image in the artifact directory. Other files are left alone.
    /// Failures are logged and counted, never returned.
    pub async fn purge(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to list artifact directory");
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read artifact directory entry");
                    report.failed += 1;
                    break;
                }
            };

            if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }

            if !entry.file_name().to_str().is_some_and(is_artifact_name) {
                continue;
            }

            let path = entry.path();

            match fs::remove_file(&path).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete QR artifact");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Matches the `ticket_{id}_qr.png` names produced by `path_for`
fn is_artifact_name(name: &str) -> bool {
    name.strip_prefix("ticket_")
        .and_then(|rest| rest.strip_suffix("_qr.png"))
        .is_some_and(|id| id.parse::<i32>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("qr"));

        let path = store.write(7, b"png-bytes").await.unwrap();
        assert_eq!(path, store.path_for(7));
        assert!(path.ends_with("ticket_7_qr.png"));
        assert_eq!(store.read(&path).await.unwrap(), Some(b"png-bytes".to_vec()));

        store.write(8, b"more").await.unwrap();
        let report = store.purge().await;
        assert_eq!(report, PurgeReport { removed: 2, failed: 0 });
        assert_eq!(store.read(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_leaves_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        store.write(3, b"png").await.unwrap();
        let foreign = dir.path().join("important.txt");
        let scratch = dir.path().join("temp_qr.png");
        std::fs::write(&foreign, b"keep me").unwrap();
        std::fs::write(&scratch, b"keep me too").unwrap();

        let report = store.purge().await;

        assert_eq!(report, PurgeReport { removed: 1, failed: 0 });
        assert!(!store.path_for(3).exists());
        assert!(foreign.exists());
        assert!(scratch.exists());
    }

    #[test]
    fn test_artifact_names() {
        assert!(is_artifact_name("ticket_12_qr.png"));
        assert!(!is_artifact_name("ticket__qr.png"));
        assert!(!is_artifact_name("ticket_abc_qr.png"));
        assert!(!is_artifact_name("temp_qr.png"));
        assert!(!is_artifact_name("ticket_12_qr.png.bak"));
    }

    #[tokio::test]
    async fn test_purge_of_missing_directory_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("never-created"));

        assert_eq!(store.purge().await, PurgeReport::default());
    }
}
