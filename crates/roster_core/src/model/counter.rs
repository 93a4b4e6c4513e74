//! Per-group sequence counters.
//!
//! # Invariants
//! - `total` never decreases through normal operation.
//! - The teacher population shares one counter under `TEACHER_COUNTER_KEY`.

/// Collection holding counter documents.
pub const CLASSES_COLLECTION: &str = "classes";
/// Counter document key for the teacher population.
pub const TEACHER_COUNTER_KEY: &str = "total_teacher";
/// Counter document field holding the current total.
pub const COUNTER_TOTAL_FIELD: &str = "total";

/// Sequence counter for one group (a grade or the teacher population).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    /// Document key inside `CLASSES_COLLECTION`.
    pub group_key: String,
    /// Number of sequence numbers handed out so far.
    pub total: u64,
}

/// Counter document key for a student grade.
pub fn grade_counter_key(grade: i64) -> String {
    grade.to_string()
}
