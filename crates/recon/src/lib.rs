//! `gradcheck-recon`: Degree-progress reconciliation engine.
//!
//! Pure engine crate: receives a pre-parsed curriculum document and a loaded
//! transcript, returns annotated per-category course bundles and weighted
//! statistics. File formats live in `gradcheck-io`; persistence goes through
//! the ports in [`store`].

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod extract;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod progress;
pub mod snapshot;
pub mod store;
pub mod transcript;

pub use aggregate::{aggregate, GradedRecord, WeightedSummary};
pub use config::ReconPolicy;
pub use edit::RowEdit;
pub use engine::{import_degree_progress, run, ImportOutcome};
pub use error::ReconError;
pub use filter::ColumnFilter;
pub use progress::CategoryProgress;
pub use model::{
    AnnotatedCourseRow, CourseBundle, CourseField, CourseStatus, CreditRequirement, PairedBy,
    PlannedCourseRow, RawTable, SourceDocument, TableWarning,
};
pub use snapshot::DegreeProgressSnapshot;
pub use store::{MemoryStore, SnapshotStore, TranscriptStore};
pub use transcript::{StudentIdentity, TranscriptCourse, TranscriptIndex, TranscriptRecord};
