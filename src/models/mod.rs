pub mod de;
pub mod document;
pub mod exam;
pub mod loaders;
pub mod report;

pub use document::{Chunk, Document, DocumentRole, PageRange};
pub use exam::{AnalysisRecord, AssessmentObjective, ExamItem};
pub use loaders::{load_all_jobs, load_audit_job, AuditJob};
pub use report::{
    AuditMeta, AuditReport, EntryStatus, EntryValue, ItemFailure, WorkingTable,
    WorkingTableEntry, WorkingTableKey,
};
