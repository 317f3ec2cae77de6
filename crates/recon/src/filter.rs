//! Per-column allow-list filtering applied before aggregation.
//!
//! A filter holds, for each constrained column, the set of values to
//! INCLUDE. Columns without an entry are unconstrained.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::AnnotatedCourseRow;
use crate::transcript::TranscriptCourse;

/// Row whose cells can be read by column name.
pub trait ColumnValues {
    fn column_value(&self, column: &str) -> Option<Cow<'_, str>>;
}

impl ColumnValues for AnnotatedCourseRow {
    fn column_value(&self, column: &str) -> Option<Cow<'_, str>> {
        self.cell(column).map(Cow::Borrowed)
    }
}

impl ColumnValues for TranscriptCourse {
    fn column_value(&self, column: &str) -> Option<Cow<'_, str>> {
        self.attribute(column)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilter {
    /// column -> values to include. An empty set rejects every row.
    selected: BTreeMap<String, BTreeSet<String>>,
}

impl ColumnFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to `values`, replacing any earlier restriction.
    pub fn allow<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected
            .insert(column.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a `COLUMN=V1,V2` clause and add it. Values are trimmed; an empty
    /// right-hand side yields an empty allow-list.
    pub fn allow_clause(self, clause: &str) -> Option<Self> {
        let (column, values) = clause.split_once('=')?;
        let column = column.trim();
        if column.is_empty() {
            return None;
        }
        let values: Vec<String> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        Some(self.allow(column, values))
    }

    /// Is this filter active (has any criteria)?
    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn constrains(&self, column: &str) -> bool {
        self.selected.contains_key(column)
    }

    /// A row passes when every constrained column exists on it and holds an
    /// allowed value.
    pub fn passes<R: ColumnValues + ?Sized>(&self, row: &R) -> bool {
        self.selected.iter().all(|(column, allowed)| {
            row.column_value(column)
                .is_some_and(|v| allowed.contains(&*v))
        })
    }

    pub fn apply<'r, R: ColumnValues>(&self, rows: &'r [R]) -> Vec<&'r R> {
        rows.iter().filter(|r| self.passes(*r)).collect()
    }
}

/// Entry in a column's distinct-value listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueValueEntry {
    pub value: String,
    /// Count of rows with this value.
    pub count: usize,
}

/// Candidate values for a column filter, sorted by value. Rows without the
/// column are not counted.
pub fn distinct_values<R: ColumnValues>(rows: &[R], column: &str) -> Vec<UniqueValueEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        if let Some(v) = row.column_value(column) {
            *counts.entry(v.into_owned()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(value, count)| UniqueValueEntry { value, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn courses() -> Vec<TranscriptCourse> {
        [
            json!({"课程名": "高等数学", "课程性质": "必修", "学年学期": "2023-2024-1"}),
            json!({"课程名": "大学物理", "课程性质": "必修", "学年学期": "2023-2024-2"}),
            json!({"课程名": "电影赏析", "课程性质": "选修", "学年学期": "2023-2024-2"}),
            json!({"课程名": "无性质课程"}),
        ]
        .into_iter()
        .map(|v| match v {
            serde_json::Value::Object(m) => TranscriptCourse::new(m),
            _ => unreachable!(),
        })
        .collect()
    }

    #[test]
    fn inactive_filter_passes_everything() {
        let rows = courses();
        let filter = ColumnFilter::new();
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&rows).len(), 4);
    }

    #[test]
    fn allow_list_on_one_column() {
        let rows = courses();
        let filter = ColumnFilter::new().allow("课程性质", ["必修"]);
        let names: Vec<_> = filter
            .apply(&rows)
            .iter()
            .map(|c| c.attribute("课程名").unwrap().into_owned())
            .collect();
        assert_eq!(names, vec!["高等数学", "大学物理"]);
    }

    #[test]
    fn every_constrained_column_must_match() {
        let rows = courses();
        let filter = ColumnFilter::new()
            .allow("课程性质", ["必修", "选修"])
            .allow("学年学期", ["2023-2024-2"]);
        assert_eq!(filter.apply(&rows).len(), 2);
    }

    #[test]
    fn missing_column_fails() {
        let rows = courses();
        let filter = ColumnFilter::new().allow("课程性质", ["必修", "选修"]);
        assert!(!filter.passes(&rows[3]));
    }

    #[test]
    fn empty_allow_list_rejects_all() {
        let rows = courses();
        let filter = ColumnFilter::new().allow("课程性质", Vec::<String>::new());
        assert!(filter.apply(&rows).is_empty());
    }

    #[test]
    fn parse_clause() {
        let filter = ColumnFilter::new().allow_clause("status = completed, exempt").unwrap();
        assert_eq!(
            filter,
            ColumnFilter::new().allow("status", ["completed", "exempt"])
        );
        assert!(ColumnFilter::new().allow_clause("no-equals").is_none());
        assert!(ColumnFilter::new().allow_clause("=x").is_none());
    }

    #[test]
    fn filter_on_annotated_status() {
        use crate::model::{CourseStatus, PlannedCourseRow};

        let row = |name: &str, status| AnnotatedCourseRow {
            course: PlannedCourseRow::new(name),
            status,
            score: String::new(),
            grade_point: String::new(),
        };
        let rows = vec![
            row("高等数学", CourseStatus::Completed),
            row("体育", CourseStatus::Exempt),
            row("离散数学", CourseStatus::NotCompleted),
        ];
        let filter = ColumnFilter::new().allow("status", ["completed"]);
        let kept = filter.apply(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].course.course_name, "高等数学");
    }

    #[test]
    fn distinct_values_sorted_with_counts() {
        let rows = courses();
        let values = distinct_values(&rows, "课程性质");
        assert_eq!(
            values,
            vec![
                UniqueValueEntry { value: "必修".into(), count: 2 },
                UniqueValueEntry { value: "选修".into(), count: 1 },
            ]
        );
    }
}
