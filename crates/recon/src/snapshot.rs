//! Persisted degree-progress snapshot.
//!
//! Wire shape, one element per category:
//!
//! ```json
//! [{"table": {"header": ["课程名称", "学分", "status", "score", "grade_point"],
//!             "data": [["高等数学", "5", "completed", "92", "4.0"]]},
//!   "info": ["公共基础课", 10, 6],
//!   "paired_by": "label"}]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{
    AnnotatedCourseRow, CourseBundle, CourseField, CourseStatus, CreditRequirement, PairedBy,
    PlannedCourseRow, GRADE_POINT_COLUMN, SCORE_COLUMN, STATUS_COLUMN,
};

/// The annotated bundles of one document import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegreeProgressSnapshot {
    pub bundles: Vec<CourseBundle>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BundleWire {
    table: TableWire,
    info: Option<(String, u32, u32)>,
    #[serde(default)]
    paired_by: Option<PairedBy>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableWire {
    header: Vec<String>,
    data: Vec<Vec<String>>,
}

impl DegreeProgressSnapshot {
    pub fn new(bundles: Vec<CourseBundle>) -> Self {
        Self { bundles }
    }

    pub fn to_json(&self) -> Result<String, ReconError> {
        let wire: Vec<BundleWire> = self.bundles.iter().map(to_wire).collect();
        serde_json::to_string_pretty(&wire).map_err(|e| ReconError::SnapshotParse(e.to_string()))
    }

    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let wire: Vec<BundleWire> =
            serde_json::from_str(input).map_err(|e| ReconError::SnapshotParse(e.to_string()))?;
        let bundles = wire
            .into_iter()
            .enumerate()
            .map(|(i, w)| from_wire(w).map_err(|msg| ReconError::SnapshotParse(format!("table {i}: {msg}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bundles })
    }

    /// Bundle whose requirement names `category`.
    pub fn bundle(&self, category: &str) -> Option<&CourseBundle> {
        self.bundles.iter().find(|b| b.category() == Some(category))
    }

    pub fn rows(&self) -> impl Iterator<Item = &AnnotatedCourseRow> {
        self.bundles.iter().flat_map(|b| b.rows.iter())
    }
}

fn to_wire(bundle: &CourseBundle) -> BundleWire {
    BundleWire {
        table: TableWire {
            header: bundle.header(),
            data: bundle.rows.iter().map(|r| bundle.row_cells(r)).collect(),
        },
        info: bundle
            .requirement
            .as_ref()
            .map(|r| (r.category.clone(), r.required_credits, r.elective_credits)),
        paired_by: bundle.paired_by,
    }
}

fn from_wire(wire: BundleWire) -> Result<CourseBundle, String> {
    let header = wire.table.header;
    let trailer = [STATUS_COLUMN, SCORE_COLUMN, GRADE_POINT_COLUMN];
    if header.len() < trailer.len() || header[header.len() - trailer.len()..] != trailer {
        return Err(format!(
            "header must end with {}",
            trailer.join(", ")
        ));
    }

    let field_count = header.len() - trailer.len();
    let fields = header[..field_count]
        .iter()
        .map(|label| CourseField::from_label(label).ok_or_else(|| format!("unknown column '{label}'")))
        .collect::<Result<Vec<_>, _>>()?;
    if !fields.contains(&CourseField::CourseName) {
        return Err(format!("no '{}' column", CourseField::CourseName.label()));
    }

    let mut rows = Vec::with_capacity(wire.table.data.len());
    for (r, mut cells) in wire.table.data.into_iter().enumerate() {
        if cells.len() != header.len() {
            return Err(format!(
                "row {r} has {} cell(s), header has {}",
                cells.len(),
                header.len()
            ));
        }
        let grade_point = cells.pop().unwrap_or_default();
        let score = cells.pop().unwrap_or_default();
        let status_text = cells.pop().unwrap_or_default();
        let status = CourseStatus::parse(&status_text)
            .ok_or_else(|| format!("row {r}: unknown status '{status_text}'"))?;

        let mut course = PlannedCourseRow::default();
        for (field, value) in fields.iter().zip(cells) {
            course.set(*field, value);
        }
        rows.push(AnnotatedCourseRow {
            course,
            status,
            score,
            grade_point,
        });
    }

    Ok(CourseBundle {
        requirement: wire
            .info
            .map(|(category, required, elective)| CreditRequirement::new(category, required, elective)),
        paired_by: wire.paired_by,
        fields,
        rows,
    })
}
