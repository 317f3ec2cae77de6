use serde_json::{Number, Value};

use crate::error::ReconError;
use crate::model::{CourseBundle, CourseField};
use crate::transcript::TranscriptRecord;

/// A single-cell change supplied by the presentation layer. Aggregates are
/// not updated here; callers re-run the aggregator afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowEdit {
    pub row_index: usize,
    pub field: String,
    pub value: String,
}

impl RowEdit {
    pub fn new(row_index: usize, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            row_index,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Set an attribute of transcript course `row_index` (0-based, identity
    /// object excluded). Any attribute name is accepted. A number stays a
    /// number when the new text parses as one.
    pub fn apply_to_transcript(&self, record: &mut TranscriptRecord) -> Result<(), ReconError> {
        let len = record.courses.len();
        let course = record
            .courses
            .get_mut(self.row_index)
            .ok_or(ReconError::RowOutOfRange {
                row: self.row_index,
                len,
            })?;

        let field = self.field.trim();
        if field.is_empty() {
            return Err(ReconError::UnknownField(self.field.clone()));
        }

        let was_number = matches!(course.attributes.get(field), Some(Value::Number(_)));
        let value = if was_number {
            parse_json_number(&self.value).unwrap_or_else(|| Value::String(self.value.clone()))
        } else {
            Value::String(self.value.clone())
        };
        course.set_attribute(field, value);
        Ok(())
    }

    /// Set a curriculum field of annotated row `row_index`. Only columns the
    /// bundle carries can change, and the course name is fixed since it is
    /// what the status was derived from.
    pub fn apply_to_bundle(&self, bundle: &mut CourseBundle) -> Result<(), ReconError> {
        let field = CourseField::from_label(self.field.trim())
            .filter(|f| *f != CourseField::CourseName && bundle.fields.contains(f))
            .ok_or_else(|| ReconError::UnknownField(self.field.clone()))?;

        let len = bundle.rows.len();
        let row = bundle
            .rows
            .get_mut(self.row_index)
            .ok_or(ReconError::RowOutOfRange {
                row: self.row_index,
                len,
            })?;
        row.course.set(field, self.value.trim());
        Ok(())
    }
}

fn parse_json_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
