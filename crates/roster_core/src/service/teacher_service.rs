//! Teacher use-case service.
//!
//! # Responsibility
//! - Create teachers under ids derived from the shared `total_teacher` counter.
//! - List teachers with cursor paging.
//! - Get, edit (merge) and delete single teachers.
//!
//! # Invariants
//! - Creating a teacher advances `classes/total_teacher` by exactly one.
//! - `edit_teacher` never changes `id`.

use super::error::RecordResult;
use super::{
    delete_record, load_record, merge_existing, require_id, write_new_record, RecordOptions,
};
use crate::model::counter::TEACHER_COUNTER_KEY;
use crate::model::identifier::{allocate, RecordKind};
use crate::model::teacher::{NewTeacher, Teacher, TeacherChanges, TEACHERS_COLLECTION};
use crate::pagination::{CursorOrdering, CursorPage, PageStrategy};
use crate::repo::counter_repo::CounterRepository;
use crate::store::{encode_fields, DocumentStore};
use log::info;

const TEACHER_ANCHOR_FIELD_SPLIT: &str = "first_name";
const TEACHER_PAGE_FIELD: &str = "last_name";

/// Teacher service over a document store.
pub struct TeacherService<S: DocumentStore> {
    store: S,
    options: RecordOptions,
}

impl<S: DocumentStore> TeacherService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, RecordOptions::default())
    }

    pub fn with_options(store: S, options: RecordOptions) -> Self {
        Self { store, options }
    }

    /// Skips the first `begin` teachers and returns up to `size` after them.
    ///
    /// Sort keys follow `RecordOptions::teacher_cursor_ordering`.
    pub fn list_teachers(
        &self,
        begin: Option<i64>,
        size: Option<i64>,
    ) -> RecordResult<Vec<Teacher>> {
        let strategy = self.cursor_page(begin, size);
        let docs = strategy.fetch(&self.store, TEACHERS_COLLECTION)?;
        let teachers = docs
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<Vec<Teacher>, _>>()?;
        Ok(teachers)
    }

    pub fn get_teacher(&self, id: &str) -> RecordResult<Teacher> {
        load_record(&self.store, TEACHERS_COLLECTION, id)
    }

    pub fn total_teachers(&self) -> RecordResult<u64> {
        Ok(self.store.count(TEACHERS_COLLECTION)?)
    }

    /// Creates a teacher under the next id of the teacher population.
    ///
    /// # Errors
    /// - `DependencyMissing` when `classes/total_teacher` was never provisioned.
    pub fn create_teacher(&self, input: NewTeacher) -> RecordResult<Teacher> {
        input.validate()?;
        let sequence = CounterRepository::new(&self.store)
            .claim_next(TEACHER_COUNTER_KEY, self.options.counter_max_attempts)?;

        let id = allocate(RecordKind::Teacher, sequence, &input.date_of_birth, None);
        let teacher = input.into_teacher(id);
        write_new_record(
            &self.store,
            self.options.duplicate_id_policy,
            TEACHERS_COLLECTION,
            &teacher.id,
            encode_fields(&teacher)?,
        )?;

        info!(
            "event=teacher_create module=service status=ok id={} sequence={}",
            teacher.id, sequence
        );
        Ok(teacher)
    }

    pub fn edit_teacher(&self, id: &str, changes: TeacherChanges) -> RecordResult<Teacher> {
        let id = require_id(id)?;
        changes.validate()?;
        let changed_fields =
            merge_existing(&self.store, TEACHERS_COLLECTION, id, encode_fields(&changes)?)?;

        info!(
            "event=teacher_edit module=service status=ok id={} fields={}",
            id, changed_fields
        );
        load_record(&self.store, TEACHERS_COLLECTION, id)
    }

    pub fn delete_teacher(&self, id: &str) -> RecordResult<()> {
        delete_record(&self.store, TEACHERS_COLLECTION, id)?;
        info!("event=teacher_delete module=service status=ok id={}", id.trim());
        Ok(())
    }

    fn cursor_page(&self, begin: Option<i64>, size: Option<i64>) -> CursorPage {
        match self.options.teacher_cursor_ordering {
            CursorOrdering::Consistent => CursorPage::new(TEACHER_PAGE_FIELD, begin, size),
            CursorOrdering::Split => {
                CursorPage::split(TEACHER_ANCHOR_FIELD_SPLIT, TEACHER_PAGE_FIELD, begin, size)
            }
        }
    }
}
