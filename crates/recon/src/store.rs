//! Persistence ports. File-backed implementations live in `gradcheck-io`.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::ReconError;
use crate::snapshot::DegreeProgressSnapshot;
use crate::transcript::TranscriptRecord;

/// Transcripts keyed by student id.
pub trait TranscriptStore {
    /// `TranscriptNotFound` when nothing is stored for `student_id`.
    fn load_transcript(&self, student_id: &str) -> Result<TranscriptRecord, ReconError>;
    fn save_transcript(&self, record: &TranscriptRecord) -> Result<(), ReconError>;
    fn delete_transcript(&self, student_id: &str) -> Result<(), ReconError>;
    fn has_transcript(&self, student_id: &str) -> bool;
}

/// Degree-progress snapshots keyed by student id. A save replaces the
/// previous snapshot.
pub trait SnapshotStore {
    fn load_snapshot(&self, student_id: &str) -> Result<Option<DegreeProgressSnapshot>, ReconError>;
    fn save_snapshot(
        &self,
        student_id: &str,
        snapshot: &DegreeProgressSnapshot,
    ) -> Result<(), ReconError>;
}

/// In-memory store for both ports.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transcripts: RefCell<HashMap<String, TranscriptRecord>>,
    snapshots: RefCell<HashMap<String, DegreeProgressSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(self, record: TranscriptRecord) -> Self {
        self.transcripts
            .borrow_mut()
            .insert(record.student.student_id.clone(), record);
        self
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.borrow().len()
    }
}

impl TranscriptStore for MemoryStore {
    fn load_transcript(&self, student_id: &str) -> Result<TranscriptRecord, ReconError> {
        self.transcripts
            .borrow()
            .get(student_id)
            .cloned()
            .ok_or_else(|| ReconError::TranscriptNotFound {
                student_id: student_id.to_string(),
            })
    }

    fn save_transcript(&self, record: &TranscriptRecord) -> Result<(), ReconError> {
        self.transcripts
            .borrow_mut()
            .insert(record.student.student_id.clone(), record.clone());
        Ok(())
    }

    fn delete_transcript(&self, student_id: &str) -> Result<(), ReconError> {
        self.transcripts
            .borrow_mut()
            .remove(student_id)
            .map(|_| ())
            .ok_or_else(|| ReconError::TranscriptNotFound {
                student_id: student_id.to_string(),
            })
    }

    fn has_transcript(&self, student_id: &str) -> bool {
        self.transcripts.borrow().contains_key(student_id)
    }
}

impl SnapshotStore for MemoryStore {
    fn load_snapshot(&self, student_id: &str) -> Result<Option<DegreeProgressSnapshot>, ReconError> {
        Ok(self.snapshots.borrow().get(student_id).cloned())
    }

    fn save_snapshot(
        &self,
        student_id: &str,
        snapshot: &DegreeProgressSnapshot,
    ) -> Result<(), ReconError> {
        self.snapshots
            .borrow_mut()
            .insert(student_id.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{StudentIdentity, TranscriptCourse};

    fn record(id: &str) -> TranscriptRecord {
        TranscriptRecord {
            student: StudentIdentity::new("张三", id),
            courses: vec![TranscriptCourse::default()],
        }
    }

    #[test]
    fn transcript_lifecycle() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_transcript("1"),
            Err(ReconError::TranscriptNotFound { .. })
        ));

        store.save_transcript(&record("1")).unwrap();
        assert!(store.has_transcript("1"));
        assert_eq!(store.load_transcript("1").unwrap().student.name, "张三");

        store.delete_transcript("1").unwrap();
        assert!(!store.has_transcript("1"));
        assert!(store.delete_transcript("1").is_err());
    }

    #[test]
    fn snapshot_save_replaces() {
        let store = MemoryStore::new();
        assert_eq!(store.load_snapshot("1").unwrap(), None);

        store.save_snapshot("1", &DegreeProgressSnapshot::default()).unwrap();
        store.save_snapshot("1", &DegreeProgressSnapshot::default()).unwrap();
        assert_eq!(store.snapshot_count(), 1);
        assert!(store.load_snapshot("1").unwrap().is_some());
    }
}
