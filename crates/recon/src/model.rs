use std::fmt;

use serde::{Deserialize, Serialize};

/// Header appended after the course fields for the reconciled status.
pub const STATUS_COLUMN: &str = "status";
/// Header appended after the course fields for the transcript score.
pub const SCORE_COLUMN: &str = "score";
/// Header appended after the course fields for the transcript grade point.
pub const GRADE_POINT_COLUMN: &str = "grade_point";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A table as extracted from the curriculum document. Row 0 is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
    /// Last non-empty paragraph before the table, used for label pairing.
    pub caption: Option<String>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows, caption: None }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Header cells, trimmed. `None` for a table without rows.
    pub fn header(&self) -> Option<Vec<String>> {
        self.rows
            .first()
            .map(|row| row.iter().map(|c| c.trim().to_string()).collect())
    }
}

/// The abstract shape of a curriculum document: paragraphs and tables, each
/// in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub paragraphs: Vec<String>,
    pub tables: Vec<RawTable>,
}

// ---------------------------------------------------------------------------
// Curriculum
// ---------------------------------------------------------------------------

/// Minimum credits for one curriculum category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequirement {
    pub category: String,
    pub required_credits: u32,
    pub elective_credits: u32,
}

impl CreditRequirement {
    pub fn new(category: impl Into<String>, required_credits: u32, elective_credits: u32) -> Self {
        Self {
            category: category.into(),
            required_credits,
            elective_credits,
        }
    }

    /// Widened so two `u32` counts never overflow.
    pub fn total_credits(&self) -> u64 {
        u64::from(self.required_credits) + u64::from(self.elective_credits)
    }
}

/// Recognized curriculum columns, declared in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CourseField {
    #[serde(rename = "课程名称")]
    CourseName,
    #[serde(rename = "修读形式")]
    DeliveryMode,
    #[serde(rename = "学分")]
    Credits,
    #[serde(rename = "总学时")]
    TotalHours,
    #[serde(rename = "开课学年")]
    AcademicYear,
    #[serde(rename = "开课学期")]
    AcademicTerm,
}

impl CourseField {
    pub const ALL: [CourseField; 6] = [
        CourseField::CourseName,
        CourseField::DeliveryMode,
        CourseField::Credits,
        CourseField::TotalHours,
        CourseField::AcademicYear,
        CourseField::AcademicTerm,
    ];

    /// Column header text used in curriculum documents.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CourseName => "课程名称",
            Self::DeliveryMode => "修读形式",
            Self::Credits => "学分",
            Self::TotalHours => "总学时",
            Self::AcademicYear => "开课学年",
            Self::AcademicTerm => "开课学期",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }
}

impl fmt::Display for CourseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One curriculum row. Optional fields are `Some` only when the source table
/// carried that column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedCourseRow {
    pub course_name: String,
    pub delivery_mode: Option<String>,
    pub credits: Option<String>,
    pub total_hours: Option<String>,
    pub academic_year: Option<String>,
    pub academic_term: Option<String>,
}

impl PlannedCourseRow {
    pub fn new(course_name: impl Into<String>) -> Self {
        Self {
            course_name: course_name.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, field: CourseField) -> Option<&str> {
        match field {
            CourseField::CourseName => Some(self.course_name.as_str()),
            CourseField::DeliveryMode => self.delivery_mode.as_deref(),
            CourseField::Credits => self.credits.as_deref(),
            CourseField::TotalHours => self.total_hours.as_deref(),
            CourseField::AcademicYear => self.academic_year.as_deref(),
            CourseField::AcademicTerm => self.academic_term.as_deref(),
        }
    }

    pub fn set(&mut self, field: CourseField, value: impl Into<String>) {
        let value = value.into();
        match field {
            CourseField::CourseName => self.course_name = value,
            CourseField::DeliveryMode => self.delivery_mode = Some(value),
            CourseField::Credits => self.credits = Some(value),
            CourseField::TotalHours => self.total_hours = Some(value),
            CourseField::AcademicYear => self.academic_year = Some(value),
            CourseField::AcademicTerm => self.academic_term = Some(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Completed,
    Exempt,
    Subtotal,
    NotCompleted,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Exempt => "exempt",
            Self::Subtotal => "subtotal",
            Self::NotCompleted => "not_completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "exempt" => Some(Self::Exempt),
            "subtotal" => Some(Self::Subtotal),
            "not_completed" => Some(Self::NotCompleted),
            _ => None,
        }
    }

    /// Completed or satisfied by policy.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Completed | Self::Exempt)
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A curriculum row with its reconciled status. `score` and `grade_point`
/// are empty unless the status is `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedCourseRow {
    pub course: PlannedCourseRow,
    pub status: CourseStatus,
    pub score: String,
    pub grade_point: String,
}

impl AnnotatedCourseRow {
    /// Cell lookup by header text: a course field label or one of the
    /// appended status/score/grade-point columns.
    pub fn cell(&self, column: &str) -> Option<&str> {
        match column {
            STATUS_COLUMN => Some(self.status.as_str()),
            SCORE_COLUMN => Some(self.score.as_str()),
            GRADE_POINT_COLUMN => Some(self.grade_point.as_str()),
            other => CourseField::from_label(other).and_then(|f| self.course.get(f)),
        }
    }
}

/// How a bundle got its credit requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairedBy {
    /// Table caption named the requirement's category.
    Label,
    /// Table index in the filtered sequence matched the requirement index.
    Position,
}

/// One curriculum category: its requirement and its reconciled rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseBundle {
    pub requirement: Option<CreditRequirement>,
    pub paired_by: Option<PairedBy>,
    /// Columns present in the source table, in canonical order.
    pub fields: Vec<CourseField>,
    pub rows: Vec<AnnotatedCourseRow>,
}

impl CourseBundle {
    pub fn category(&self) -> Option<&str> {
        self.requirement.as_ref().map(|r| r.category.as_str())
    }

    /// Field labels followed by the status, score and grade-point columns.
    pub fn header(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.label().to_string())
            .chain([STATUS_COLUMN, SCORE_COLUMN, GRADE_POINT_COLUMN].map(String::from))
            .collect()
    }

    /// Row cells aligned with [`CourseBundle::header`].
    pub fn row_cells(&self, row: &AnnotatedCourseRow) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| row.course.get(*f).unwrap_or_default().to_string())
            .chain([
                row.status.as_str().to_string(),
                row.score.clone(),
                row.grade_point.clone(),
            ])
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Structural warnings
// ---------------------------------------------------------------------------

/// Non-fatal structural problems found while normalizing a document.
/// `table_index` is the table's position in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableWarning {
    /// No table carried the sentinel column.
    NoQualifyingTables { tables_seen: usize },
    /// Table has the sentinel column but no course-name column.
    MissingJoinKey { table_index: usize, header: Vec<String> },
    /// Table kept, but no requirement could be paired with it.
    Unpaired { table_index: usize },
    /// Requirement extracted but never paired with a table.
    UnclaimedRequirement { category: String },
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQualifyingTables { tables_seen } => {
                write!(f, "no curriculum tables found among {tables_seen} table(s)")
            }
            Self::MissingJoinKey { table_index, header } => write!(
                f,
                "table {table_index}: no '{}' column (header: {}); table skipped",
                CourseField::CourseName.label(),
                header.join(", ")
            ),
            Self::Unpaired { table_index } => {
                write!(f, "table {table_index}: no credit requirement to pair with")
            }
            Self::UnclaimedRequirement { category } => {
                write!(f, "credit requirement '{category}' has no matching table")
            }
        }
    }
}
