use std::borrow::Cow;

use serde::Serialize;

use crate::config::{ReconPolicy, TranscriptColumns};
use crate::model::AnnotatedCourseRow;
use crate::transcript::TranscriptCourse;

/// A row the aggregator can read credit, score, grade point and course type
/// from. Transcript entries resolve these through the configured attribute
/// names; curriculum rows carry them as typed fields.
pub trait GradedRecord {
    fn credits(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>>;
    fn score(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>>;
    fn grade_point(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>>;
    fn course_type(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>>;
}

impl GradedRecord for TranscriptCourse {
    fn credits(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>> {
        self.attribute(&columns.credits)
    }

    fn score(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>> {
        self.attribute(&columns.score)
    }

    fn grade_point(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>> {
        self.attribute(&columns.grade_point)
    }

    fn course_type(&self, columns: &TranscriptColumns) -> Option<Cow<'_, str>> {
        self.attribute(&columns.course_type)
    }
}

impl GradedRecord for AnnotatedCourseRow {
    fn credits(&self, _: &TranscriptColumns) -> Option<Cow<'_, str>> {
        self.course.credits.as_deref().map(Cow::Borrowed)
    }

    fn score(&self, _: &TranscriptColumns) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.score.as_str()))
    }

    fn grade_point(&self, _: &TranscriptColumns) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.grade_point.as_str()))
    }

    fn course_type(&self, _: &TranscriptColumns) -> Option<Cow<'_, str>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightedSummary {
    /// Σ(grade point × credit) / Σ credit. `None` when no credit counted.
    pub weighted_gpa: Option<f64>,
    /// Σ(score × credit) / Σ credit. `None` when no credit counted.
    pub weighted_score: Option<f64>,
    pub gpa_credits: f64,
    pub score_credits: f64,
    /// Records that contributed to at least one denominator.
    pub records_counted: usize,
    /// Records skipped as university electives or for a non-numeric credit.
    pub records_skipped: usize,
}

impl WeightedSummary {
    pub fn gpa_display(&self) -> String {
        format_stat(self.weighted_gpa)
    }

    pub fn score_display(&self) -> String {
        format_stat(self.weighted_score)
    }
}

/// Five fractional digits, or `N/A`.
pub fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.5}"),
        None => "N/A".to_string(),
    }
}

fn parse_number(text: Option<Cow<'_, str>>) -> Option<f64> {
    text?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Credit-weighted GPA and score over already-filtered records.
///
/// - university electives are skipped entirely
/// - a non-numeric credit skips the record
/// - a pass/fail score leaves the score average; it leaves the GPA average
///   too unless `pass_fail_counts_toward_gpa` is set
/// - a non-numeric score or grade point only drops out of its own numerator
pub fn aggregate<'r, R, I>(records: I, policy: &ReconPolicy) -> WeightedSummary
where
    R: GradedRecord + 'r,
    I: IntoIterator<Item = &'r R>,
{
    let columns = &policy.transcript;
    let rules = &policy.aggregate;

    let mut gpa_sum = 0.0;
    let mut score_sum = 0.0;
    let mut out = WeightedSummary::default();

    for record in records {
        if record
            .course_type(columns)
            .is_some_and(|t| t.trim() == rules.university_elective)
        {
            out.records_skipped += 1;
            continue;
        }

        let Some(credit) = parse_number(record.credits(columns)) else {
            out.records_skipped += 1;
            continue;
        };

        let score_text = record.score(columns);
        let pass_fail = score_text
            .as_deref()
            .is_some_and(|s| s.trim() == rules.pass_fail);

        if !pass_fail {
            out.score_credits += credit;
            if let Some(score) = parse_number(score_text) {
                score_sum += score * credit;
            }
        }

        if !pass_fail || rules.pass_fail_counts_toward_gpa {
            out.records_counted += 1;
            out.gpa_credits += credit;
            if let Some(gp) = parse_number(record.grade_point(columns)) {
                gpa_sum += gp * credit;
            }
        }
    }

    out.weighted_gpa = (out.gpa_credits != 0.0).then(|| gpa_sum / out.gpa_credits);
    out.weighted_score = (out.score_credits != 0.0).then(|| score_sum / out.score_credits);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn course(value: Value) -> TranscriptCourse {
        match value {
            Value::Object(map) => TranscriptCourse::new(map),
            _ => unreachable!(),
        }
    }

    fn run(courses: &[TranscriptCourse]) -> WeightedSummary {
        aggregate(courses, &ReconPolicy::default())
    }

    #[test]
    fn pass_fail_excluded_from_score() {
        let s = run(&[
            course(json!({"学分": 4, "总成绩": 90, "绩点": 4.0})),
            course(json!({"学分": 3, "总成绩": "合格", "绩点": 3.0})),
        ]);
        assert_eq!(s.weighted_score, Some(90.0));
        assert_eq!(s.weighted_gpa, Some(4.0));
        assert_eq!(s.score_credits, 4.0);
        assert_eq!(s.records_counted, 1);
    }

    #[test]
    fn pass_fail_counts_toward_gpa_when_enabled() {
        let mut policy = ReconPolicy::default();
        policy.aggregate.pass_fail_counts_toward_gpa = true;
        let courses = [
            course(json!({"学分": 4, "总成绩": 90, "绩点": 4.0})),
            course(json!({"学分": 4, "总成绩": "合格", "绩点": 3.0})),
        ];
        let s = aggregate(&courses, &policy);
        assert_eq!(s.weighted_gpa, Some(3.5));
        assert_eq!(s.weighted_score, Some(90.0));
        assert_eq!(s.gpa_credits, 8.0);
    }

    #[test]
    fn weighted_by_credit() {
        let s = run(&[
            course(json!({"学分": "2", "总成绩": "80", "绩点": "3.0"})),
            course(json!({"学分": "6", "总成绩": "100", "绩点": "4.0"})),
        ]);
        assert_eq!(s.weighted_score, Some(95.0));
        assert_eq!(s.weighted_gpa, Some(3.75));
        assert_eq!(s.gpa_display(), "3.75000");
    }

    #[test]
    fn university_elective_skipped_entirely() {
        let s = run(&[
            course(json!({"学分": 2, "总成绩": 60, "绩点": 1.0, "课程性质": "校选课"})),
            course(json!({"学分": 2, "总成绩": 90, "绩点": 4.0, "课程性质": "必修"})),
        ]);
        assert_eq!(s.weighted_score, Some(90.0));
        assert_eq!(s.records_skipped, 1);
    }

    #[test]
    fn non_numeric_credit_skips_record() {
        let s = run(&[
            course(json!({"学分": "", "总成绩": 10})),
            course(json!({"总成绩": 10})),
            course(json!({"学分": 1, "总成绩": 70, "绩点": 2.0})),
        ]);
        assert_eq!(s.weighted_score, Some(70.0));
        assert_eq!(s.records_skipped, 2);
    }

    #[test]
    fn non_numeric_score_only_leaves_its_numerator() {
        let s = run(&[
            course(json!({"学分": 2, "总成绩": "缺考", "绩点": 0.0})),
            course(json!({"学分": 2, "总成绩": 80, "绩点": 3.0})),
        ]);
        assert_eq!(s.weighted_score, Some(40.0));
        assert_eq!(s.weighted_gpa, Some(1.5));
    }

    #[test]
    fn zero_credit_is_not_applicable() {
        let s = run(&[course(json!({"学分": 0, "总成绩": 90, "绩点": 4.0}))]);
        assert_eq!(s.weighted_gpa, None);
        assert_eq!(s.weighted_score, None);
        assert_eq!(s.gpa_display(), "N/A");
        assert_eq!(s.score_display(), "N/A");

        let empty: Vec<TranscriptCourse> = Vec::new();
        assert_eq!(run(&empty).weighted_score, None);
    }

    #[test]
    fn annotated_rows_use_typed_fields() {
        use crate::model::{CourseStatus, PlannedCourseRow};

        let mut planned = PlannedCourseRow::new("高等数学");
        planned.credits = Some("5".into());
        let row = AnnotatedCourseRow {
            course: planned,
            status: CourseStatus::Completed,
            score: "92".into(),
            grade_point: "4.0".into(),
        };
        let s = aggregate([&row], &ReconPolicy::default());
        assert_eq!(s.weighted_score, Some(92.0));
        assert_eq!(s.score_display(), "92.00000");
    }
}
