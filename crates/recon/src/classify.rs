use crate::config::ReconPolicy;
use crate::model::{AnnotatedCourseRow, CourseBundle, CourseStatus, PlannedCourseRow};
use crate::normalize::NormalizedTable;
use crate::transcript::{normalize_name, TranscriptIndex};

/// Decide the status of one planned row.
///
/// Order: subtotal marker, then transcript match, then the exempt list,
/// then not completed. Score and grade point are only filled for a
/// transcript match.
pub fn classify_row(
    row: &PlannedCourseRow,
    index: &TranscriptIndex<'_>,
    policy: &ReconPolicy,
) -> AnnotatedCourseRow {
    let name = if policy.classify.normalize_course_names {
        normalize_name(&row.course_name)
    } else {
        row.course_name.clone()
    };

    let (status, score, grade_point) = if name == policy.classify.subtotal_marker {
        (CourseStatus::Subtotal, String::new(), String::new())
    } else if let Some(course) = index.lookup(&name) {
        let cols = &policy.transcript;
        (
            CourseStatus::Completed,
            course.attribute(&cols.score).unwrap_or_default().into_owned(),
            course.attribute(&cols.grade_point).unwrap_or_default().into_owned(),
        )
    } else if policy.is_exempt(&name) {
        (CourseStatus::Exempt, String::new(), String::new())
    } else {
        (CourseStatus::NotCompleted, String::new(), String::new())
    };

    AnnotatedCourseRow {
        course: row.clone(),
        status,
        score,
        grade_point,
    }
}

/// Reconcile every row of a normalized table into a bundle.
pub fn classify_table(
    table: &NormalizedTable,
    index: &TranscriptIndex<'_>,
    policy: &ReconPolicy,
) -> CourseBundle {
    CourseBundle {
        requirement: table.requirement.clone(),
        paired_by: table.paired_by,
        fields: table.fields.clone(),
        rows: table
            .rows
            .iter()
            .map(|row| classify_row(row, index, policy))
            .collect(),
    }
}
