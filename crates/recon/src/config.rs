use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::CourseField;

// ---------------------------------------------------------------------------
// Top-level policy
// ---------------------------------------------------------------------------

/// Every fixed rule the engine applies. `Default` is the stock policy; a TOML
/// file only needs the keys it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconPolicy {
    pub document: DocumentPolicy,
    pub transcript: TranscriptColumns,
    pub classify: ClassifyPolicy,
    pub aggregate: AggregatePolicy,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentPolicy {
    /// Marker preceding the minimum required credits in a paragraph.
    pub required_marker: String,
    /// Marker preceding the minimum elective credits in a paragraph.
    pub elective_marker: String,
    /// Header cell a table must carry to count as a curriculum table.
    pub sentinel_column: String,
    /// Columns to keep, in output order.
    pub fields: Vec<CourseField>,
    /// Pair tables with requirements by caption before falling back to position.
    pub pair_by_label: bool,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            required_marker: "最低必修学分数".into(),
            elective_marker: "最低选修学分数".into(),
            sentinel_column: "理论教学学时".into(),
            fields: CourseField::ALL.to_vec(),
            pair_by_label: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Transcript columns
// ---------------------------------------------------------------------------

/// Attribute names used inside transcript course entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscriptColumns {
    pub course_name: String,
    pub score: String,
    pub grade_point: String,
    pub credits: String,
    pub course_type: String,
    /// Keys every course entry must carry for the transcript to load.
    pub required_keys: Vec<String>,
}

impl Default for TranscriptColumns {
    fn default() -> Self {
        Self {
            course_name: "课程名".into(),
            score: "总成绩".into(),
            grade_point: "绩点".into(),
            credits: "学分".into(),
            course_type: "课程性质".into(),
            required_keys: ["课程名", "课程性质", "学分", "学年学期", "等级成绩", "绩点"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifyPolicy {
    /// Course name of display-only subtotal rows.
    pub subtotal_marker: String,
    /// Courses counted as completed by institutional policy.
    pub exempt_courses: Vec<String>,
    /// Trim and collapse whitespace on both sides before name matching.
    pub normalize_course_names: bool,
}

impl Default for ClassifyPolicy {
    fn default() -> Self {
        Self {
            subtotal_marker: "小计".into(),
            exempt_courses: vec![
                "体育".into(),
                "大学英语".into(),
                "跨学科基础课".into(),
                "形势与政策".into(),
                "新时代劳动教育".into(),
            ],
            normalize_course_names: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatePolicy {
    /// Course type skipped entirely (credit not counted either).
    pub university_elective: String,
    /// Score text of pass/fail courses.
    pub pass_fail: String,
    /// Keep pass/fail credit and grade point in the GPA average.
    pub pass_fail_counts_toward_gpa: bool,
}

impl Default for AggregatePolicy {
    fn default() -> Self {
        Self {
            university_elective: "校选课".into(),
            pass_fail: "合格".into(),
            pass_fail_counts_toward_gpa: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconPolicy {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let policy: ReconPolicy =
            toml::from_str(input).map_err(|e| ReconError::PolicyParse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::PolicyParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let doc = &self.document;
        for (name, value) in [
            ("document.required_marker", &doc.required_marker),
            ("document.elective_marker", &doc.elective_marker),
            ("document.sentinel_column", &doc.sentinel_column),
            ("transcript.course_name", &self.transcript.course_name),
            ("classify.subtotal_marker", &self.classify.subtotal_marker),
        ] {
            if value.trim().is_empty() {
                return Err(ReconError::PolicyValidation(format!("{name} must not be empty")));
            }
        }

        if self.transcript.required_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ReconError::PolicyValidation(
                "transcript.required_keys must not contain blank keys".to_string(),
            ));
        }

        if !doc.fields.contains(&CourseField::CourseName) {
            return Err(ReconError::PolicyValidation(format!(
                "document.fields must include '{}'",
                CourseField::CourseName.label()
            )));
        }

        let mut seen = HashSet::new();
        for field in &doc.fields {
            if !seen.insert(field) {
                return Err(ReconError::PolicyValidation(format!(
                    "document.fields lists '{field}' twice"
                )));
            }
        }

        Ok(())
    }

    pub fn is_exempt(&self, course_name: &str) -> bool {
        self.classify.exempt_courses.iter().any(|c| c == course_name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
