//! Core logic for roster: student and teacher records over a document store.
//! This crate owns id allocation, counter sequencing and paging invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, DuplicateIdPolicy, LoggingConfig, RosterConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::counter::{Counter, CLASSES_COLLECTION, TEACHER_COUNTER_KEY};
pub use model::identifier::{allocate, RecordKind};
pub use model::student::{NewStudent, Student, StudentChanges, STUDENTS_COLLECTION};
pub use model::teacher::{NewTeacher, Teacher, TeacherChanges, TEACHERS_COLLECTION};
pub use model::ValidationError;
pub use pagination::{CursorOrdering, CursorPage, OffsetPage, PageStrategy, PageWindow};
pub use repo::counter_repo::{CounterError, CounterRepository, CounterResult};
pub use service::error::{RecordResult, RecordServiceError};
pub use service::student_service::{StudentPage, StudentService};
pub use service::teacher_service::TeacherService;
pub use service::RecordOptions;
pub use store::{
    Document, DocumentQuery, DocumentStore, MemoryDocumentStore, SetMode, SqliteDocumentStore,
    StoreError, StoreResult,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
