// File I/O operations

pub mod docx;
pub mod spreadsheet;
pub mod store;

pub use store::{write_atomic, FileSnapshotStore, FileTranscriptStore};
