use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// Policy TOML parse / deserialization error.
    PolicyParse(String),
    /// Policy validation error (empty marker, missing join-key field, etc.).
    PolicyValidation(String),
    /// No transcript stored for the student.
    TranscriptNotFound { student_id: String },
    /// Transcript file is not valid JSON.
    TranscriptParse(String),
    /// Transcript has the wrong shape (too short, missing identity keys, a
    /// course entry without a required key).
    TranscriptSchema(String),
    /// Curriculum document could not be read.
    Document(String),
    /// Degree-progress snapshot could not be decoded.
    SnapshotParse(String),
    /// Edit targets a row past the end of the collection.
    RowOutOfRange { row: usize, len: usize },
    /// Edit targets a field the row type cannot hold.
    UnknownField(String),
    /// IO error (file read, write, rename).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PolicyParse(msg) => write!(f, "policy parse error: {msg}"),
            Self::PolicyValidation(msg) => write!(f, "policy validation error: {msg}"),
            Self::TranscriptNotFound { student_id } => {
                write!(f, "no transcript stored for student '{student_id}'")
            }
            Self::TranscriptParse(msg) => write!(f, "transcript is not valid JSON: {msg}"),
            Self::TranscriptSchema(msg) => write!(f, "transcript schema error: {msg}"),
            Self::Document(msg) => write!(f, "cannot read curriculum document: {msg}"),
            Self::SnapshotParse(msg) => write!(f, "degree-progress snapshot error: {msg}"),
            Self::RowOutOfRange { row, len } => {
                write!(f, "row {row} out of range ({len} row(s))")
            }
            Self::UnknownField(field) => write!(f, "unknown field: {field}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<std::io::Error> for ReconError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}
