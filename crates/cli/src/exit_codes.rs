//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `gradcheck`. Scripts rely on
//! them, so existing values never change meaning.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, malformed student id)         |
//! | 3    | I/O error (unreadable input, failed write)           |
//! | 10   | No transcript stored for the student                 |
//! | 11   | Stored transcript is not valid JSON                  |
//! | 12   | Stored transcript has the wrong shape                |
//! | 13   | Curriculum document cannot be read                   |
//! | 14   | Policy file invalid                                  |
//! | 15   | Edit rejected (row out of range, unknown field)      |
//! | 16   | Degree-progress snapshot missing or unreadable       |

use gradcheck_recon::ReconError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Reconciliation (10-19)
// =============================================================================

pub const EXIT_TRANSCRIPT_NOT_FOUND: u8 = 10;

pub const EXIT_TRANSCRIPT_PARSE: u8 = 11;

pub const EXIT_TRANSCRIPT_SCHEMA: u8 = 12;

pub const EXIT_DOCUMENT: u8 = 13;

/// Policy TOML failed to parse or validate.
pub const EXIT_POLICY: u8 = 14;

/// Edit targets a missing row or a field the row cannot hold.
pub const EXIT_EDIT: u8 = 15;

/// `plan import` has not been run for the student, or its output is corrupt.
pub const EXIT_SNAPSHOT: u8 = 16;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::PolicyParse(_) | ReconError::PolicyValidation(_) => EXIT_POLICY,
        ReconError::TranscriptNotFound { .. } => EXIT_TRANSCRIPT_NOT_FOUND,
        ReconError::TranscriptParse(_) => EXIT_TRANSCRIPT_PARSE,
        ReconError::TranscriptSchema(_) => EXIT_TRANSCRIPT_SCHEMA,
        ReconError::Document(_) => EXIT_DOCUMENT,
        ReconError::SnapshotParse(_) => EXIT_SNAPSHOT,
        ReconError::RowOutOfRange { .. } | ReconError::UnknownField(_) => EXIT_EDIT,
        ReconError::Io(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_TRANSCRIPT_NOT_FOUND,
            EXIT_TRANSCRIPT_PARSE,
            EXIT_TRANSCRIPT_SCHEMA,
            EXIT_DOCUMENT,
            EXIT_POLICY,
            EXIT_EDIT,
            EXIT_SNAPSHOT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_codes() {
        assert_eq!(
            recon_exit_code(&ReconError::TranscriptNotFound { student_id: "1".into() }),
            EXIT_TRANSCRIPT_NOT_FOUND
        );
        assert_eq!(
            recon_exit_code(&ReconError::RowOutOfRange { row: 9, len: 2 }),
            EXIT_EDIT
        );
        assert_eq!(recon_exit_code(&ReconError::Io("x".into())), EXIT_IO);
    }
}
