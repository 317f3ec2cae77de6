// gradcheck CLI - degree-progress reconciliation from the command line

mod exit_codes;
mod logging;
mod plan;
mod policy;
mod report;
mod transcript;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use gradcheck_config::Settings;
use gradcheck_io::{FileSnapshotStore, FileTranscriptStore};
use gradcheck_recon::transcript::is_valid_student_id;
use gradcheck_recon::{ReconError, ReconPolicy};

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_POLICY, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "gradcheck")]
#[command(about = "Reconcile a curriculum plan against a transcript and report degree progress")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Directory holding transcripts and degree-progress snapshots
    #[arg(long, global = true, env = "GRADCHECK_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Reconciliation policy (TOML); defaults apply to omitted keys
    #[arg(long, global = true, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import, inspect, edit or delete a stored transcript
    #[command(subcommand)]
    Transcript(transcript::TranscriptCommands),

    /// Reconcile a curriculum plan document, or correct the stored result
    #[command(subcommand)]
    Plan(plan::PlanCommands),

    /// Per-category credit progress from the last plan import
    #[command(after_help = "\
Examples:
  gradcheck progress 20230001000001
  gradcheck progress 20230001000001 --details
  gradcheck progress 20230001000001 --json | jq '.[].fraction_complete'")]
    Progress {
        /// Student id (14 digits)
        id: String,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,

        /// List every course of every category with its status
        #[arg(long)]
        details: bool,
    },

    /// Credit-weighted GPA and score
    #[command(after_help = "\
Plan statistics count completed courses unless --where constrains 'status'.

Examples:
  gradcheck stats 20230001000001
  gradcheck stats 20230001000001 --where 课程性质=必修,限选
  gradcheck stats 20230001000001 --source plan --where 开课学年=2023-2024")]
    Stats {
        /// Student id (14 digits)
        id: String,

        /// Rows to aggregate
        #[arg(long, value_enum, default_value_t = report::StatsSource::Transcript)]
        source: report::StatsSource,

        /// Allow-list filter 'COLUMN=V1,V2'. Repeatable.
        #[arg(long, value_name = "EXPR")]
        r#where: Vec<String>,

        /// Output JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show or check reconciliation policies
    #[command(subcommand)]
    Policy(policy::PolicyCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "warn" };
    if let Err(e) = logging::init(level) {
        eprintln!("warning: {e}");
    }

    let result = Context::load(cli.data_dir, cli.policy, cli.quiet).and_then(|mut ctx| {
        match cli.command {
            Commands::Transcript(cmd) => transcript::cmd_transcript(&mut ctx, cmd),
            Commands::Plan(cmd) => plan::cmd_plan(&mut ctx, cmd),
            Commands::Progress { id, json, details } => {
                report::cmd_progress(&ctx, &id, json, details)
            }
            Commands::Stats {
                id,
                source,
                r#where: where_clauses,
                json,
            } => report::cmd_stats(&ctx, &id, source, &where_clauses, json),
            Commands::Policy(cmd) => policy::cmd_policy(&ctx, cmd),
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Resolved settings, policy and stores for one invocation.
pub struct Context {
    pub settings: Settings,
    pub policy: ReconPolicy,
    pub transcripts: FileTranscriptStore,
    pub snapshots: FileSnapshotStore,
    pub quiet: bool,
}

impl Context {
    fn load(
        data_dir: Option<PathBuf>,
        policy_path: Option<PathBuf>,
        quiet: bool,
    ) -> Result<Self, CliError> {
        let settings = Settings::load();

        let policy = match policy_path.or_else(|| settings.policy_path.clone()) {
            Some(path) => policy::load_policy(&path)?,
            None => ReconPolicy::default(),
        };

        let data_dir = data_dir.unwrap_or_else(|| settings.effective_data_dir());
        tracing::debug!(data_dir = %data_dir.display(), "stores resolved");
        Ok(Self {
            transcripts: FileTranscriptStore::new(&data_dir),
            snapshots: FileSnapshotStore::new(&data_dir),
            settings,
            policy,
            quiet,
        })
    }

    /// Persist settings; failure is reported but never fails the command.
    pub fn save_settings(&self) {
        if let Err(e) = self.settings.save() {
            eprintln!("warning: cannot save settings: {e}");
        }
    }
}

/// Reject ids that are not 14 ASCII digits before touching the stores.
pub fn require_student_id(id: &str) -> Result<(), CliError> {
    if is_valid_student_id(id) {
        Ok(())
    } else {
        Err(CliError::args(format!("invalid student id {id:?}"))
            .with_hint("student ids are exactly 14 digits"))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self { code: EXIT_POLICY, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::TranscriptNotFound { .. } => {
                Some("import one with: gradcheck transcript import <file> --id <id> --name <name>")
            }
            ReconError::TranscriptParse(_) | ReconError::TranscriptSchema(_) => {
                Some("re-import the transcript with --force")
            }
            ReconError::RowOutOfRange { .. } => {
                Some("rows are numbered from 0; see `transcript show` or `progress --details`")
            }
            _ => None,
        };
        Self {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }
}
