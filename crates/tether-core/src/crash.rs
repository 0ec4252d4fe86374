//! Crash report management
//!
//! The engine's crash handler leaves a minidump (`<id>.dmp`) and a key/value
//! sidecar (`<id>.json`) in the crash directory. The controller lets the host
//! list, upload and delete them.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::background::{BackgroundPool, Pending};

#[derive(Error, Debug)]
pub enum CrashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid crash keys: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Crash report not found: {0}")]
    NotFound(String),

    #[error("No crash uploader configured")]
    UploadUnavailable,

    #[error("Upload failed: {0}")]
    Upload(String),
}

pub trait CrashFileManager: Send + Sync {
    /// Ids of crash reports that have not been uploaded
    fn pending_crashes(&self) -> Result<Vec<String>, CrashError>;

    fn delete(&self, crash_id: &str) -> Result<(), CrashError>;

    /// Upload and return the server-side report id.
    fn upload(&self, crash_id: &str) -> Result<String, CrashError>;

    fn crash_keys(&self, crash_id: &str) -> Result<Option<HashMap<String, String>>, CrashError>;
}

pub trait CrashUploader: Send + Sync {
    fn upload(
        &self,
        minidump: &[u8],
        keys: &HashMap<String, String>,
    ) -> Result<String, CrashError>;
}

const DUMP_EXTENSION: &str = "dmp";
const KEYS_EXTENSION: &str = "json";
const UPLOADED_EXTENSION: &str = "uploaded";

/// Crash reports stored as files in one directory
pub struct DirectoryCrashFiles {
    dir: PathBuf,
    uploader: Option<Arc<dyn CrashUploader>>,
}

impl DirectoryCrashFiles {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            uploader: None,
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn CrashUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, crash_id: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", crash_id, extension))
    }

    fn dump_path(&self, crash_id: &str) -> Result<PathBuf, CrashError> {
        let path = self.path(crash_id, DUMP_EXTENSION);
        if path.is_file() {
            Ok(path)
        } else {
            Err(CrashError::NotFound(crash_id.to_string()))
        }
    }
}

impl CrashFileManager for DirectoryCrashFiles {
    fn pending_crashes(&self) -> Result<Vec<String>, CrashError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(DUMP_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Remove the dump (pending or uploaded) and its keys.
    fn delete(&self, crash_id: &str) -> Result<(), CrashError> {
        let mut removed = 0;
        for extension in [DUMP_EXTENSION, UPLOADED_EXTENSION, KEYS_EXTENSION] {
            let path = self.path(crash_id, extension);
            if path.is_file() {
                fs::remove_file(path)?;
                removed += 1;
            }
        }
        if removed == 0 {
            return Err(CrashError::NotFound(crash_id.to_string()));
        }

        tracing::info!(crash_id = %crash_id, files = removed, "Deleted crash report");
        Ok(())
    }

    fn upload(&self, crash_id: &str) -> Result<String, CrashError> {
        let uploader = self.uploader.as_ref().ok_or(CrashError::UploadUnavailable)?;
        let minidump = fs::read(self.dump_path(crash_id)?)?;
        let keys = self.crash_keys(crash_id)?.unwrap_or_default();

        let report_id = uploader.upload(&minidump, &keys)?;

        // Uploaded dumps stop showing up as pending
        fs::rename(
            self.path(crash_id, DUMP_EXTENSION),
            self.path(crash_id, UPLOADED_EXTENSION),
        )?;

        tracing::info!(crash_id = %crash_id, report_id = %report_id, "Uploaded crash report");
        Ok(report_id)
    }

    fn crash_keys(&self, crash_id: &str) -> Result<Option<HashMap<String, String>>, CrashError> {
        let path = self.path(crash_id, KEYS_EXTENSION);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Host-facing crash reporter
#[derive(Clone)]
pub struct CrashReporterController {
    files: Arc<dyn CrashFileManager>,
    pool: BackgroundPool,
    /// Crash ids with an upload in flight
    uploading: Arc<RwLock<Vec<String>>>,
}

impl CrashReporterController {
    pub(crate) fn new(files: Arc<dyn CrashFileManager>, pool: BackgroundPool) -> Self {
        Self {
            files,
            pool,
            uploading: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn pending_crashes(&self) -> crate::Result<Vec<String>> {
        let uploading = self.uploading.read().clone();
        Ok(self
            .files
            .pending_crashes()?
            .into_iter()
            .filter(|id| !uploading.contains(id))
            .collect())
    }

    pub fn delete_crash(&self, crash_id: &str) -> Pending<()> {
        let files = Arc::clone(&self.files);
        let crash_id = crash_id.to_string();
        self.pool.run(move || Ok(files.delete(&crash_id)?))
    }

    pub fn upload_crash(&self, crash_id: &str) -> Pending<String> {
        let files = Arc::clone(&self.files);
        let uploading = Arc::clone(&self.uploading);
        let crash_id = crash_id.to_string();
        uploading.write().push(crash_id.clone());

        self.pool.run(move || {
            let result = files.upload(&crash_id);
            uploading.write().retain(|id| id != &crash_id);
            if let Err(e) = &result {
                tracing::warn!(crash_id = %crash_id, error = %e, "Crash upload failed");
            }
            Ok(result?)
        })
    }

    pub fn crash_keys(&self, crash_id: &str) -> Option<HashMap<String, String>> {
        match self.files.crash_keys(crash_id) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(crash_id = %crash_id, error = %e, "Unreadable crash keys");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::resolve;
    use crate::error::CoreError;

    struct FixedUploader;

    impl CrashUploader for FixedUploader {
        fn upload(
            &self,
            minidump: &[u8],
            keys: &HashMap<String, String>,
        ) -> Result<String, CrashError> {
            assert_eq!(minidump, b"MDMP");
            Ok(format!("report-{}", keys.get("ptype").cloned().unwrap_or_default()))
        }
    }

    fn write_crash(dir: &Path, id: &str, keys: Option<&str>) {
        fs::write(dir.join(format!("{}.dmp", id)), b"MDMP").unwrap();
        if let Some(keys) = keys {
            fs::write(dir.join(format!("{}.json", id)), keys).unwrap();
        }
    }

    #[test]
    fn test_pending_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_crash(dir.path(), "b", None);
        write_crash(dir.path(), "a", Some(r#"{"ptype":"renderer"}"#));
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = DirectoryCrashFiles::new(dir.path().to_path_buf());
        assert_eq!(files.pending_crashes().unwrap(), vec!["a", "b"]);

        let keys = files.crash_keys("a").unwrap().unwrap();
        assert_eq!(keys.get("ptype").map(String::as_str), Some("renderer"));
        assert!(files.crash_keys("b").unwrap().is_none());
    }

    #[test]
    fn test_missing_dir_has_no_crashes() {
        let files = DirectoryCrashFiles::new(PathBuf::from("/nonexistent/tether-crashes"));
        assert!(files.pending_crashes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_delete_resolve_in_background() {
        let dir = tempfile::tempdir().unwrap();
        write_crash(dir.path(), "one", Some(r#"{"ptype":"gpu"}"#));
        write_crash(dir.path(), "two", None);

        let files = DirectoryCrashFiles::new(dir.path().to_path_buf())
            .with_uploader(Arc::new(FixedUploader));
        let controller =
            CrashReporterController::new(Arc::new(files), BackgroundPool::new().unwrap());

        let report = resolve(controller.upload_crash("one")).await.unwrap();
        assert_eq!(report, "report-gpu");

        resolve(controller.delete_crash("two")).await.unwrap();
        assert!(controller.pending_crashes().unwrap().is_empty());

        let missing = resolve(controller.delete_crash("two")).await;
        assert!(matches!(
            missing,
            Err(CoreError::Crash(CrashError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_uploaded_crash_can_be_deleted() {
        let dir = tempfile::tempdir().unwrap();
        write_crash(dir.path(), "one", Some(r#"{"ptype":"browser"}"#));

        let files = DirectoryCrashFiles::new(dir.path().to_path_buf())
            .with_uploader(Arc::new(FixedUploader));
        let controller =
            CrashReporterController::new(Arc::new(files), BackgroundPool::new().unwrap());

        resolve(controller.upload_crash("one")).await.unwrap();
        assert!(dir.path().join("one.uploaded").exists());

        resolve(controller.delete_crash("one")).await.unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_uploader_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_crash(dir.path(), "one", None);

        let controller = CrashReporterController::new(
            Arc::new(DirectoryCrashFiles::new(dir.path().to_path_buf())),
            BackgroundPool::new().unwrap(),
        );

        let result = resolve(controller.upload_crash("one")).await;
        assert!(matches!(
            result,
            Err(CoreError::Crash(CrashError::UploadUnavailable))
        ));
        assert_eq!(controller.pending_crashes().unwrap(), vec!["one"]);
    }
}
