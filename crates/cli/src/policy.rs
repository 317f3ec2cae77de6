//! `gradcheck policy` - inspect and validate reconciliation policies.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use gradcheck_recon::ReconPolicy;

use crate::{CliError, Context};

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Print the effective policy as TOML
    #[command(after_help = "\
Examples:
  gradcheck policy show > policy.toml
  gradcheck --policy strict.toml policy show")]
    Show,

    /// Check a policy file without running anything
    Validate {
        /// Policy TOML file
        file: PathBuf,
    },
}

pub fn cmd_policy(ctx: &Context, cmd: PolicyCommands) -> Result<(), CliError> {
    match cmd {
        PolicyCommands::Show => {
            let text = ctx.policy.to_toml().map_err(|e| CliError::policy(e.to_string()))?;
            print!("{text}");
            Ok(())
        }
        PolicyCommands::Validate { file } => {
            load_policy(&file)?;
            if !ctx.quiet {
                println!("{}: ok", file.display());
            }
            Ok(())
        }
    }
}

/// Read and validate a policy file.
pub fn load_policy(path: &Path) -> Result<ReconPolicy, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read policy {}: {e}", path.display())))?;
    ReconPolicy::from_toml(&text)
        .map_err(|e| CliError::policy(format!("{}: {e}", path.display())))
}
