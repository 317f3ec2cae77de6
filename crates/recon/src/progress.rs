use serde::Serialize;

use crate::model::{CourseBundle, CourseStatus};

/// Credit progress of one curriculum category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub category: Option<String>,
    /// Σ numeric credits of completed and exempt rows.
    pub earned_credits: f64,
    /// required + elective, `None` for a bundle without a requirement.
    pub target_credits: Option<u64>,
    pub completed: usize,
    pub exempt: usize,
    pub not_completed: usize,
    pub subtotal: usize,
}

impl CategoryProgress {
    pub fn of(bundle: &CourseBundle) -> Self {
        let mut out = Self {
            category: bundle.category().map(String::from),
            earned_credits: 0.0,
            target_credits: bundle.requirement.as_ref().map(|r| r.total_credits()),
            completed: 0,
            exempt: 0,
            not_completed: 0,
            subtotal: 0,
        };

        for row in &bundle.rows {
            match row.status {
                CourseStatus::Completed => out.completed += 1,
                CourseStatus::Exempt => out.exempt += 1,
                CourseStatus::NotCompleted => out.not_completed += 1,
                CourseStatus::Subtotal => out.subtotal += 1,
            }
            if row.status.is_satisfied() {
                let credit = row
                    .course
                    .credits
                    .as_deref()
                    .and_then(|c| c.trim().parse::<f64>().ok())
                    .filter(|c| c.is_finite());
                out.earned_credits += credit.unwrap_or(0.0);
            }
        }

        out
    }

    /// earned / target clamped to [0, 1]. `None` when the target is missing
    /// or zero.
    pub fn fraction_complete(&self) -> Option<f64> {
        match self.target_credits {
            Some(t) if t > 0 => Some((self.earned_credits / t as f64).clamp(0.0, 1.0)),
            _ => None,
        }
    }

    pub fn is_met(&self) -> bool {
        self.fraction_complete().is_some_and(|f| f >= 1.0)
    }
}

pub fn progress_report(bundles: &[CourseBundle]) -> Vec<CategoryProgress> {
    bundles.iter().map(CategoryProgress::of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotatedCourseRow, CourseField, CreditRequirement, PlannedCourseRow};

    fn row(name: &str, credits: &str, status: CourseStatus) -> AnnotatedCourseRow {
        let mut course = PlannedCourseRow::new(name);
        course.credits = Some(credits.into());
        AnnotatedCourseRow {
            course,
            status,
            score: String::new(),
            grade_point: String::new(),
        }
    }

    fn bundle(requirement: Option<CreditRequirement>, rows: Vec<AnnotatedCourseRow>) -> CourseBundle {
        CourseBundle {
            requirement,
            paired_by: None,
            fields: vec![CourseField::CourseName, CourseField::Credits],
            rows,
        }
    }

    #[test]
    fn counts_completed_and_exempt_credits() {
        let b = bundle(
            Some(CreditRequirement::new("公共基础课", 10, 6)),
            vec![
                row("高等数学", "5", CourseStatus::Completed),
                row("体育", "4", CourseStatus::Exempt),
                row("离散数学", "3", CourseStatus::NotCompleted),
                row("小计", "12", CourseStatus::Subtotal),
                row("实验", "", CourseStatus::Completed),
            ],
        );
        let p = CategoryProgress::of(&b);
        assert_eq!(p.earned_credits, 9.0);
        assert_eq!(p.target_credits, Some(16));
        assert_eq!((p.completed, p.exempt, p.not_completed, p.subtotal), (2, 1, 1, 1));
        assert_eq!(p.fraction_complete(), Some(9.0 / 16.0));
        assert!(!p.is_met());
    }

    #[test]
    fn fraction_is_clamped() {
        let b = bundle(
            Some(CreditRequirement::new("专业课", 2, 0)),
            vec![row("a", "5", CourseStatus::Completed)],
        );
        let p = CategoryProgress::of(&b);
        assert_eq!(p.fraction_complete(), Some(1.0));
        assert!(p.is_met());
    }

    #[test]
    fn target_beyond_u32_does_not_overflow() {
        let b = bundle(
            Some(CreditRequirement::new("x", 4_000_000_000, 4_000_000_000)),
            vec![row("a", "4", CourseStatus::Completed)],
        );
        let p = CategoryProgress::of(&b);
        assert_eq!(p.target_credits, Some(8_000_000_000));
        assert!(p.fraction_complete().is_some_and(|f| f > 0.0 && f < 1e-6));
    }

    #[test]
    fn zero_or_missing_target_is_not_applicable() {
        let zero = bundle(Some(CreditRequirement::new("x", 0, 0)), vec![]);
        assert_eq!(CategoryProgress::of(&zero).fraction_complete(), None);

        let unpaired = bundle(None, vec![row("a", "2", CourseStatus::Completed)]);
        let p = CategoryProgress::of(&unpaired);
        assert_eq!(p.category, None);
        assert_eq!(p.fraction_complete(), None);
        assert_eq!(p.earned_credits, 2.0);
    }
}
