//! `gradcheck plan` - curriculum document import.

use std::path::PathBuf;

use clap::Subcommand;

use gradcheck_io::docx;
use gradcheck_recon::progress::CategoryProgress;
use gradcheck_recon::{import_degree_progress, RowEdit, SnapshotStore};

use crate::exit_codes::EXIT_EDIT;
use crate::report::{load_snapshot, progress_rows};
use crate::util::render_table;
use crate::{require_student_id, CliError, Context};

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Read a program-plan .docx, reconcile it and replace the stored snapshot
    #[command(after_help = "\
Without --id the last student used is taken from the settings file.

Examples:
  gradcheck plan import 培养方案.docx --id 20230001000001
  gradcheck plan import 培养方案.docx")]
    Import {
        /// Program plan document (.docx)
        document: PathBuf,

        /// Student id (14 digits)
        #[arg(long)]
        id: Option<String>,
    },

    /// Correct one curriculum field of one row in the stored snapshot
    #[command(after_help = "\
Rows are numbered from 0 within the category, in document order. The course
name cannot be changed; re-import the document instead.

Examples:
  gradcheck plan edit 20230001000001 --category 公共基础课 --row 1 --field 学分 --value 6
  gradcheck plan edit 20230001000001 --category 专业课 --row 0 --field 开课学期 --value 3")]
    Edit {
        /// Student id (14 digits)
        id: String,

        /// Category of the table holding the row
        #[arg(long)]
        category: String,

        #[arg(long)]
        row: usize,

        /// Curriculum column label, e.g. 学分
        #[arg(long)]
        field: String,

        #[arg(long)]
        value: String,
    },
}

pub fn cmd_plan(ctx: &mut Context, cmd: PlanCommands) -> Result<(), CliError> {
    match cmd {
        PlanCommands::Import { document, id } => cmd_import(ctx, document, id),
        PlanCommands::Edit { id, category, row, field, value } => {
            cmd_edit(ctx, &id, &category, RowEdit::new(row, field, value))
        }
    }
}

fn cmd_edit(ctx: &Context, id: &str, category: &str, edit: RowEdit) -> Result<(), CliError> {
    require_student_id(id)?;
    let mut snapshot = load_snapshot(ctx, id)?;

    let bundle = snapshot
        .bundles
        .iter_mut()
        .find(|b| b.category() == Some(category))
        .ok_or_else(|| CliError {
            code: EXIT_EDIT,
            message: format!("no category {category:?} in the snapshot for {id}"),
            hint: Some(format!("see: gradcheck progress {id}")),
        })?;
    edit.apply_to_bundle(bundle)?;
    let progress = CategoryProgress::of(bundle);
    ctx.snapshots.save_snapshot(id, &snapshot)?;

    if !ctx.quiet {
        println!("{category} row {}: {} = {}", edit.row_index, edit.field, edit.value);
        let (header, table) = progress_rows(std::slice::from_ref(&progress));
        print!("{}", render_table(&header, &table, 24));
    }
    Ok(())
}

fn cmd_import(ctx: &mut Context, document: PathBuf, id: Option<String>) -> Result<(), CliError> {
    let id = id
        .or_else(|| ctx.settings.last_student_id.clone())
        .ok_or_else(|| {
            CliError::args("no student id given").with_hint("pass --id <14-digit id>")
        })?;
    require_student_id(&id)?;

    let source = docx::import(&document)?;
    let outcome = import_degree_progress(
        &ctx.policy,
        &source,
        &id,
        &ctx.transcripts,
        &ctx.snapshots,
    )?;

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }

    ctx.settings.remember_student(&id);
    ctx.settings.last_document_path =
        Some(std::fs::canonicalize(&document).unwrap_or(document));
    ctx.save_settings();

    if !ctx.quiet {
        let bundles = &outcome.snapshot.bundles;
        let rows: Vec<usize> = bundles.iter().map(|b| b.rows.len()).collect();
        println!(
            "reconciled {} categor{} ({} course row(s)) for {id}",
            bundles.len(),
            if bundles.len() == 1 { "y" } else { "ies" },
            rows.iter().sum::<usize>()
        );
        if !bundles.is_empty() {
            let progress: Vec<CategoryProgress> = bundles.iter().map(CategoryProgress::of).collect();
            let (header, table) = progress_rows(&progress);
            print!("{}", render_table(&header, &table, 24));
        }
    }
    Ok(())
}
