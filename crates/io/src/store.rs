// File-backed transcript and snapshot stores

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use gradcheck_recon::{
    DegreeProgressSnapshot, ReconError, SnapshotStore, TranscriptRecord, TranscriptStore,
};

/// Write via a sibling temp file and rename over the target, creating the
/// parent directory when needed.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp = path.with_extension("json.tmp");
    fs::write(&temp, contents)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Transcripts: <data_dir>/<student_id>.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileTranscriptStore {
    data_dir: PathBuf,
}

impl FileTranscriptStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, student_id: &str) -> PathBuf {
        self.data_dir.join(format!("{student_id}.json"))
    }
}

impl TranscriptStore for FileTranscriptStore {
    fn load_transcript(&self, student_id: &str) -> Result<TranscriptRecord, ReconError> {
        let path = self.path_for(student_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ReconError::TranscriptNotFound {
                    student_id: student_id.to_string(),
                })
            }
            Err(e) => return Err(ReconError::Io(format!("{}: {e}", path.display()))),
        };
        debug!(path = %path.display(), "loading transcript");
        TranscriptRecord::from_json_str(&text)
    }

    fn save_transcript(&self, record: &TranscriptRecord) -> Result<(), ReconError> {
        let path = self.path_for(&record.student.student_id);
        let json = record.to_json_pretty()?;
        write_atomic(&path, &json).map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))
    }

    fn delete_transcript(&self, student_id: &str) -> Result<(), ReconError> {
        let path = self.path_for(student_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ReconError::TranscriptNotFound {
                student_id: student_id.to_string(),
            }),
            Err(e) => Err(ReconError::Io(format!("{}: {e}", path.display()))),
        }
    }

    fn has_transcript(&self, student_id: &str) -> bool {
        self.path_for(student_id).is_file()
    }
}

// ---------------------------------------------------------------------------
// Snapshots: <data_dir>/degree_progress_<student_id>.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    data_dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, student_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("degree_progress_{student_id}.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load_snapshot(&self, student_id: &str) -> Result<Option<DegreeProgressSnapshot>, ReconError> {
        let path = self.path_for(student_id);
        match fs::read_to_string(&path) {
            Ok(text) => DegreeProgressSnapshot::from_json(&text).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReconError::Io(format!("{}: {e}", path.display()))),
        }
    }

    fn save_snapshot(
        &self,
        student_id: &str,
        snapshot: &DegreeProgressSnapshot,
    ) -> Result<(), ReconError> {
        let path = self.path_for(student_id);
        let json = snapshot.to_json()?;
        write_atomic(&path, &json).map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradcheck_recon::{StudentIdentity, TranscriptCourse};
    use serde_json::json;
    use tempfile::tempdir;

    fn record() -> TranscriptRecord {
        let mut course = TranscriptCourse::default();
        course.set_attribute("课程名", json!("高等数学"));
        course.set_attribute("学分", json!(5));
        TranscriptRecord {
            student: StudentIdentity::new("张三", "20230001000001"),
            courses: vec![course],
        }
    }

    #[test]
    fn transcript_save_load_delete() {
        let dir = tempdir().unwrap();
        let store = FileTranscriptStore::new(dir.path().join("data"));

        store.save_transcript(&record()).unwrap();
        assert!(store.has_transcript("20230001000001"));
        assert!(!dir.path().join("data/20230001000001.json.tmp").exists());

        let loaded = store.load_transcript("20230001000001").unwrap();
        assert_eq!(loaded, record());

        let text = fs::read_to_string(store.path_for("20230001000001")).unwrap();
        assert!(text.contains("\"姓名\": \"张三\""));

        store.delete_transcript("20230001000001").unwrap();
        assert!(matches!(
            store.load_transcript("20230001000001"),
            Err(ReconError::TranscriptNotFound { .. })
        ));
        assert!(matches!(
            store.delete_transcript("20230001000001"),
            Err(ReconError::TranscriptNotFound { .. })
        ));
    }

    #[test]
    fn corrupt_and_malformed_transcripts() {
        let dir = tempdir().unwrap();
        let store = FileTranscriptStore::new(dir.path());

        fs::write(store.path_for("1"), "{not json").unwrap();
        assert!(matches!(
            store.load_transcript("1"),
            Err(ReconError::TranscriptParse(_))
        ));

        fs::write(store.path_for("2"), r#"[{"姓名": "a", "学号": "2"}]"#).unwrap();
        assert!(matches!(
            store.load_transcript("2"),
            Err(ReconError::TranscriptSchema(_))
        ));
    }

    #[test]
    fn snapshot_missing_then_replaced() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        assert_eq!(store.load_snapshot("1").unwrap(), None);

        store.save_snapshot("1", &DegreeProgressSnapshot::default()).unwrap();
        let path = dir.path().join("degree_progress_1.json");
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(
            store.load_snapshot("1").unwrap(),
            Some(DegreeProgressSnapshot::default())
        );
    }

    #[test]
    fn corrupt_snapshot_is_error() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        fs::write(store.path_for("1"), "[{]").unwrap();
        assert!(matches!(
            store.load_snapshot("1"),
            Err(ReconError::SnapshotParse(_))
        ));
    }
}
