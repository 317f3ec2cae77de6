//! `gradcheck transcript` - stored transcript management.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use gradcheck_io::spreadsheet;
use gradcheck_recon::{
    aggregate, ReconError, RowEdit, StudentIdentity, TranscriptRecord, TranscriptStore,
};

use crate::util::render_table;
use crate::{require_student_id, CliError, Context};

#[derive(Subcommand)]
pub enum TranscriptCommands {
    /// Store a transcript from a JSON export or a grade sheet (xlsx/xls/ods/csv)
    #[command(after_help = "\
Examples:
  gradcheck transcript import grades.xlsx --id 20230001000001 --name 张三
  gradcheck transcript import grades.csv --id 20230001000001 --name 张三 --force
  gradcheck transcript import 20230001000001.json --id 20230001000001")]
    Import {
        /// Transcript file
        file: PathBuf,

        /// Student id (14 digits)
        #[arg(long)]
        id: String,

        /// Student name; required for grade sheets, overrides the name in JSON
        #[arg(long)]
        name: Option<String>,

        /// Replace an existing transcript
        #[arg(long)]
        force: bool,
    },

    /// Print a stored transcript
    Show {
        /// Student id (14 digits)
        id: String,

        /// Print the stored JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one attribute of one course
    #[command(after_help = "\
Rows are numbered from 0 as shown by `transcript show`.

Examples:
  gradcheck transcript edit 20230001000001 --row 2 --field 总成绩 --value 85
  gradcheck transcript edit 20230001000001 --row 0 --field 课程名 --value 高等数学A")]
    Edit {
        /// Student id (14 digits)
        id: String,

        #[arg(long)]
        row: usize,

        #[arg(long)]
        field: String,

        #[arg(long)]
        value: String,
    },

    /// Remove a stored transcript
    Delete {
        /// Student id (14 digits)
        id: String,
    },
}

pub fn cmd_transcript(ctx: &mut Context, cmd: TranscriptCommands) -> Result<(), CliError> {
    match cmd {
        TranscriptCommands::Import { file, id, name, force } => {
            cmd_import(ctx, &file, &id, name, force)
        }
        TranscriptCommands::Show { id, json } => cmd_show(ctx, &id, json),
        TranscriptCommands::Edit { id, row, field, value } => {
            cmd_edit(ctx, &id, RowEdit::new(row, field, value))
        }
        TranscriptCommands::Delete { id } => cmd_delete(ctx, &id),
    }
}

fn cmd_import(
    ctx: &mut Context,
    file: &Path,
    id: &str,
    name: Option<String>,
    force: bool,
) -> Result<(), CliError> {
    require_student_id(id)?;

    if ctx.transcripts.has_transcript(id) && !force {
        return Err(CliError::args(format!("a transcript is already stored for {id}"))
            .with_hint("add --force to replace it"));
    }

    let is_json = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let required = &ctx.policy.transcript.required_keys;
    let record = if is_json {
        let record = read_json_transcript(file, id, name)?;
        record.check_required_keys(required).map_err(|e| missing_columns(e, required))?;
        record
    } else {
        let name = name.ok_or_else(|| {
            CliError::args("--name is required when importing a grade sheet")
        })?;
        spreadsheet::import(file, StudentIdentity::new(name, id), &ctx.policy.transcript)
            .map_err(|e| missing_columns(e, required))?
    };

    ctx.transcripts.save_transcript(&record)?;
    ctx.settings.remember_student(id);
    ctx.save_settings();

    if !ctx.quiet {
        println!(
            "imported {} course(s) for {} ({})",
            record.courses.len(),
            record.student.name,
            record.student.student_id
        );
    }
    Ok(())
}

fn missing_columns(err: ReconError, required: &[String]) -> CliError {
    let schema = matches!(err, ReconError::TranscriptSchema(_));
    let cli = CliError::from(err);
    if schema {
        cli.with_hint(format!("every course needs: {}", required.join(", ")))
    } else {
        cli
    }
}

/// Load a stored transcript and check it carries the policy's required keys.
pub fn load_transcript(ctx: &Context, id: &str) -> Result<TranscriptRecord, CliError> {
    let record = ctx.transcripts.load_transcript(id)?;
    record.check_required_keys(&ctx.policy.transcript.required_keys)?;
    Ok(record)
}

fn read_json_transcript(
    file: &Path,
    id: &str,
    name: Option<String>,
) -> Result<TranscriptRecord, CliError> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| CliError::io(format!("{}: {e}", file.display())))?;
    let mut record = TranscriptRecord::from_json_str(&text)?;

    if record.student.student_id != id {
        return Err(CliError::args(format!(
            "{} belongs to student {}, not {id}",
            file.display(),
            record.student.student_id
        )));
    }
    if let Some(name) = name {
        record.student.name = name;
    }
    Ok(record)
}

fn cmd_show(ctx: &Context, id: &str, json: bool) -> Result<(), CliError> {
    require_student_id(id)?;
    let record = load_transcript(ctx, id)?;

    if json {
        println!("{}", record.to_json_pretty()?);
        return Ok(());
    }

    let columns = &ctx.policy.transcript;
    let keys = [
        columns.course_name.as_str(),
        columns.course_type.as_str(),
        columns.credits.as_str(),
        columns.score.as_str(),
        columns.grade_point.as_str(),
    ];

    let header: Vec<String> = std::iter::once("#".to_string())
        .chain(keys.iter().map(|k| k.to_string()))
        .collect();
    let rows: Vec<Vec<String>> = record
        .courses
        .iter()
        .enumerate()
        .map(|(i, course)| {
            std::iter::once(i.to_string())
                .chain(
                    keys.iter()
                        .map(|k| course.attribute(k).map(|v| v.into_owned()).unwrap_or_default()),
                )
                .collect()
        })
        .collect();

    println!("{} ({})", record.student.name, record.student.student_id);
    print!("{}", render_table(&header, &rows, 30));

    let summary = aggregate(&record.courses, &ctx.policy);
    println!();
    println!("weighted GPA:   {}", summary.gpa_display());
    println!("weighted score: {}", summary.score_display());
    Ok(())
}

fn cmd_edit(ctx: &Context, id: &str, edit: RowEdit) -> Result<(), CliError> {
    require_student_id(id)?;
    let mut record = load_transcript(ctx, id)?;
    edit.apply_to_transcript(&mut record)?;
    ctx.transcripts.save_transcript(&record)?;

    if !ctx.quiet {
        let summary = aggregate(&record.courses, &ctx.policy);
        println!(
            "row {}: {} = {}",
            edit.row_index, edit.field, edit.value
        );
        println!(
            "weighted GPA: {}  weighted score: {}",
            summary.gpa_display(),
            summary.score_display()
        );
    }
    Ok(())
}

fn cmd_delete(ctx: &Context, id: &str) -> Result<(), CliError> {
    require_student_id(id)?;
    ctx.transcripts.delete_transcript(id)?;
    if !ctx.quiet {
        println!("deleted transcript {id}");
    }
    Ok(())
}
