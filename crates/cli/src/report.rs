//! `gradcheck progress` and `gradcheck stats`.

use clap::ValueEnum;
use serde_json::{json, Value};

use gradcheck_recon::model::STATUS_COLUMN;
use gradcheck_recon::{
    aggregate, CategoryProgress, ColumnFilter, CourseStatus, DegreeProgressSnapshot,
    SnapshotStore, WeightedSummary,
};

use crate::exit_codes::EXIT_SNAPSHOT;
use crate::util::render_table;
use crate::{require_student_id, CliError, Context};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatsSource {
    /// Every course on the stored transcript
    Transcript,
    /// Reconciled rows of the last plan import
    Plan,
}

pub(crate) fn load_snapshot(ctx: &Context, id: &str) -> Result<DegreeProgressSnapshot, CliError> {
    ctx.snapshots.load_snapshot(id)?.ok_or_else(|| CliError {
        code: EXIT_SNAPSHOT,
        message: format!("no degree-progress snapshot for {id}"),
        hint: Some(format!("run: gradcheck plan import <document.docx> --id {id}")),
    })
}

// ---------------------------------------------------------------------------
// progress
// ---------------------------------------------------------------------------

/// Header and rows of the per-category progress table.
pub(crate) fn progress_rows(progress: &[CategoryProgress]) -> (Vec<String>, Vec<Vec<String>>) {
    let header = ["category", "earned", "target", "done", "completed", "exempt", "missing"]
        .map(String::from)
        .to_vec();
    let rows = progress
        .iter()
        .map(|p| {
            vec![
                p.category.clone().unwrap_or_else(|| "(unpaired)".to_string()),
                format_credits(p.earned_credits),
                p.target_credits.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
                p.fraction_complete()
                    .map(|f| format!("{:.0}%", f * 100.0))
                    .unwrap_or_else(|| "N/A".to_string()),
                p.completed.to_string(),
                p.exempt.to_string(),
                p.not_completed.to_string(),
            ]
        })
        .collect();
    (header, rows)
}

fn format_credits(credits: f64) -> String {
    if credits.fract() == 0.0 {
        format!("{credits:.0}")
    } else {
        format!("{credits:.1}")
    }
}

fn progress_json(progress: &CategoryProgress) -> Value {
    json!({
        "category": progress.category,
        "earned_credits": progress.earned_credits,
        "target_credits": progress.target_credits,
        "fraction_complete": progress.fraction_complete(),
        "met": progress.is_met(),
        "completed": progress.completed,
        "exempt": progress.exempt,
        "not_completed": progress.not_completed,
        "subtotal": progress.subtotal,
    })
}

pub fn cmd_progress(ctx: &Context, id: &str, json: bool, details: bool) -> Result<(), CliError> {
    require_student_id(id)?;
    let snapshot = load_snapshot(ctx, id)?;
    let progress: Vec<CategoryProgress> =
        snapshot.bundles.iter().map(CategoryProgress::of).collect();

    if json {
        let out: Vec<Value> = progress.iter().map(progress_json).collect();
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    let (header, rows) = progress_rows(&progress);
    print!("{}", render_table(&header, &rows, 24));

    if details {
        for bundle in &snapshot.bundles {
            let rows: Vec<Vec<String>> = bundle
                .rows
                .iter()
                .filter(|r| r.status != CourseStatus::Subtotal)
                .map(|r| bundle.row_cells(r))
                .collect();
            println!();
            println!("[{}]", bundle.category().unwrap_or("(unpaired)"));
            print!("{}", render_table(&bundle.header(), &rows, 24));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// stats
// ---------------------------------------------------------------------------

pub(crate) fn parse_filter(clauses: &[String]) -> Result<ColumnFilter, CliError> {
    clauses.iter().try_fold(ColumnFilter::new(), |filter, clause| {
        filter.allow_clause(clause).ok_or_else(|| {
            CliError::args(format!("malformed --where {clause:?}"))
                .with_hint("syntax: 'COLUMN=V1,V2'")
        })
    })
}

pub fn cmd_stats(
    ctx: &Context,
    id: &str,
    source: StatsSource,
    where_clauses: &[String],
    json: bool,
) -> Result<(), CliError> {
    require_student_id(id)?;
    let mut filter = parse_filter(where_clauses)?;

    let summary = match source {
        StatsSource::Transcript => {
            let record = crate::transcript::load_transcript(ctx, id)?;
            aggregate(filter.apply(&record.courses), &ctx.policy)
        }
        StatsSource::Plan => {
            // Planned rows that were never taken carry no score.
            if !filter.constrains(STATUS_COLUMN) {
                filter = filter.allow(STATUS_COLUMN, [CourseStatus::Completed.as_str()]);
            }
            let snapshot = load_snapshot(ctx, id)?;
            let rows: Vec<_> = snapshot.rows().filter(|r| filter.passes(*r)).collect();
            aggregate(rows, &ctx.policy)
        }
    };

    print_summary(&summary, json)
}

fn print_summary(summary: &WeightedSummary, json: bool) -> Result<(), CliError> {
    if json {
        let out = json!({
            "weighted_gpa": summary.weighted_gpa,
            "weighted_score": summary.weighted_score,
            "weighted_gpa_display": summary.gpa_display(),
            "weighted_score_display": summary.score_display(),
            "gpa_credits": summary.gpa_credits,
            "score_credits": summary.score_credits,
            "records_counted": summary.records_counted,
            "records_skipped": summary.records_skipped,
        });
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!("weighted GPA:   {}", summary.gpa_display());
    println!("weighted score: {}", summary.score_display());
    println!(
        "credits:        {} (GPA), {} (score)",
        format_credits(summary.gpa_credits),
        format_credits(summary.score_credits)
    );
    println!(
        "courses:        {} counted, {} skipped",
        summary.records_counted, summary.records_skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clauses_build_filter() {
        let filter = parse_filter(&["课程性质=必修,限选".to_string()]).unwrap();
        assert!(filter.constrains("课程性质"));
        assert!(!filter.constrains(STATUS_COLUMN));
        assert!(!parse_filter(&[]).unwrap().is_active());
    }

    #[test]
    fn malformed_where_is_usage_error() {
        let err = parse_filter(&["课程性质".to_string()]).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
    }

    #[test]
    fn progress_table_shows_na_without_target() {
        let progress = CategoryProgress {
            category: None,
            earned_credits: 2.5,
            target_credits: None,
            completed: 1,
            exempt: 0,
            not_completed: 3,
            subtotal: 0,
        };
        let (header, rows) = progress_rows(&[progress]);
        assert_eq!(header.len(), rows[0].len());
        assert_eq!(rows[0][0], "(unpaired)");
        assert_eq!(rows[0][1], "2.5");
        assert_eq!(rows[0][3], "N/A");
    }
}
