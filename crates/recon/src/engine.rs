use tracing::{info, warn};

use crate::classify::classify_table;
use crate::config::ReconPolicy;
use crate::error::ReconError;
use crate::extract::extract_requirements;
use crate::model::{SourceDocument, TableWarning};
use crate::normalize::normalize_tables;
use crate::snapshot::DegreeProgressSnapshot;
use crate::store::{SnapshotStore, TranscriptStore};
use crate::transcript::{TranscriptIndex, TranscriptRecord};

/// Result of one document import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub snapshot: DegreeProgressSnapshot,
    /// Structural problems found along the way; none of them stop the import.
    pub warnings: Vec<TableWarning>,
}

/// Extract, normalize and reconcile a document against a transcript.
pub fn run(
    policy: &ReconPolicy,
    document: &SourceDocument,
    transcript: &TranscriptRecord,
) -> Result<ImportOutcome, ReconError> {
    let requirements = extract_requirements(&document.paragraphs, &policy.document)?;
    let normalized = normalize_tables(&document.tables, &requirements, &policy.document);

    for warning in &normalized.warnings {
        warn!("{warning}");
    }

    let index = TranscriptIndex::build(transcript, policy);
    let bundles = normalized
        .tables
        .iter()
        .map(|table| classify_table(table, &index, policy))
        .collect::<Vec<_>>();

    info!(
        requirements = requirements.len(),
        tables = bundles.len(),
        transcript_courses = index.len(),
        "degree progress reconciled"
    );

    Ok(ImportOutcome {
        snapshot: DegreeProgressSnapshot::new(bundles),
        warnings: normalized.warnings,
    })
}

/// Load the student's transcript, reconcile `document` against it and
/// replace the stored snapshot. A transcript error, including a course entry
/// missing one of the policy's required keys, aborts before anything is
/// written.
pub fn import_degree_progress<T, S>(
    policy: &ReconPolicy,
    document: &SourceDocument,
    student_id: &str,
    transcripts: &T,
    snapshots: &S,
) -> Result<ImportOutcome, ReconError>
where
    T: TranscriptStore + ?Sized,
    S: SnapshotStore + ?Sized,
{
    let transcript = transcripts.load_transcript(student_id)?;
    transcript.check_required_keys(&policy.transcript.required_keys)?;
    let outcome = run(policy, document, &transcript)?;
    snapshots.save_snapshot(student_id, &outcome.snapshot)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseStatus, PairedBy, RawTable};
    use crate::store::MemoryStore;
    use serde_json::json;

    const ID: &str = "20230001000001";

    fn transcript() -> TranscriptRecord {
        TranscriptRecord::from_json_value(json!([
            {"姓名": "张三", "学号": ID},
            {"课程名": "高等数学", "课程性质": "必修", "学分": 5, "学年学期": "2023-2024-1",
             "总成绩": "92", "等级成绩": "优秀", "绩点": "4.0"}
        ]))
        .unwrap()
    }

    fn document() -> SourceDocument {
        let rows = [
            ["课程名称", "学分", "理论教学学时"],
            ["高等数学", "5", "80"],
            ["体育", "4", "64"],
            ["离散数学", "3", "48"],
            ["小计", "12", ""],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        SourceDocument {
            paragraphs: vec![
                "培养方案".into(),
                "公共基础课 最低必修学分数:10 最低选修学分数:6".into(),
            ],
            tables: vec![RawTable::new(rows)],
        }
    }

    #[test]
    fn run_reconciles_rows() {
        let out = run(&ReconPolicy::default(), &document(), &transcript()).unwrap();
        assert!(out.warnings.is_empty());
        let bundle = &out.snapshot.bundles[0];
        assert_eq!(bundle.category(), Some("公共基础课"));
        assert_eq!(bundle.paired_by, Some(PairedBy::Position));
        let statuses: Vec<_> = bundle.rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                CourseStatus::Completed,
                CourseStatus::Exempt,
                CourseStatus::NotCompleted,
                CourseStatus::Subtotal,
            ]
        );
    }

    #[test]
    fn import_saves_snapshot() {
        let store = MemoryStore::new().with_transcript(transcript());
        let out =
            import_degree_progress(&ReconPolicy::default(), &document(), ID, &store, &store).unwrap();
        assert_eq!(store.load_snapshot(ID).unwrap(), Some(out.snapshot));
    }

    #[test]
    fn missing_transcript_writes_nothing() {
        let store = MemoryStore::new();
        let err = import_degree_progress(&ReconPolicy::default(), &document(), ID, &store, &store)
            .unwrap_err();
        assert!(matches!(err, ReconError::TranscriptNotFound { .. }));
        assert_eq!(store.snapshot_count(), 0);
    }

    #[test]
    fn course_missing_required_key_writes_nothing() {
        let incomplete = TranscriptRecord::from_json_value(json!([
            {"姓名": "张三", "学号": ID},
            {"课程名": "高等数学", "学分": 5, "总成绩": "92", "绩点": "4.0"}
        ]))
        .unwrap();
        let store = MemoryStore::new().with_transcript(incomplete);
        let err = import_degree_progress(&ReconPolicy::default(), &document(), ID, &store, &store)
            .unwrap_err();
        assert!(
            matches!(&err, ReconError::TranscriptSchema(msg) if msg == "element 1 lacks required key '课程性质'"),
            "{err}"
        );
        assert_eq!(store.snapshot_count(), 0);
    }

    #[test]
    fn document_without_tables_yields_empty_snapshot() {
        let doc = SourceDocument {
            paragraphs: vec![],
            tables: vec![],
        };
        let out = run(&ReconPolicy::default(), &doc, &transcript()).unwrap();
        assert!(out.snapshot.bundles.is_empty());
        assert_eq!(out.warnings, vec![TableWarning::NoQualifyingTables { tables_seen: 0 }]);
    }

    #[test]
    fn identical_inputs_give_identical_json() {
        let policy = ReconPolicy::default();
        let a = run(&policy, &document(), &transcript()).unwrap();
        let b = run(&policy, &document(), &transcript()).unwrap();
        assert_eq!(a.snapshot.to_json().unwrap(), b.snapshot.to_json().unwrap());
    }
}
