//! Student use-case service.
//!
//! # Responsibility
//! - Create students under ids derived from their grade counter.
//! - List students by numbered pages ordered by `last_name`.
//! - Get, edit (merge) and delete single students.
//!
//! # Invariants
//! - Creating a student advances `classes/{grade}` by exactly one.
//! - `edit_student` never changes `id`, even if the payload carries one.
//! - Deleting a student never touches its grade counter.
//! - An edit racing a delete fails with `NotFound` and writes nothing.

use super::error::RecordResult;
use super::{
    delete_record, load_record, merge_existing, require_id, write_new_record, RecordOptions,
};
use crate::model::counter::grade_counter_key;
use crate::model::identifier::{allocate, student_group_label, RecordKind};
use crate::model::student::{
    NewStudent, Student, StudentChanges, STUDENTS_COLLECTION, STUDENT_ORDER_FIELD,
};
use crate::pagination::{OffsetPage, PageStrategy};
use crate::repo::counter_repo::CounterRepository;
use crate::store::{encode_fields, DocumentStore};
use log::info;

/// One page of students plus the collection size.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentPage {
    /// Students ordered by `last_name`.
    pub list: Vec<Student>,
    /// Full collection count; `None` when the page request was rejected.
    pub total: Option<u64>,
    /// Page number as requested.
    pub page: Option<i64>,
    /// Page size as requested.
    pub size: Option<i64>,
}

/// Student service over a document store.
pub struct StudentService<S: DocumentStore> {
    store: S,
    options: RecordOptions,
}

impl<S: DocumentStore> StudentService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, RecordOptions::default())
    }

    pub fn with_options(store: S, options: RecordOptions) -> Self {
        Self { store, options }
    }

    /// Lists one numbered page of students.
    ///
    /// Unusable `page`/`size` values return an empty list without scanning.
    pub fn list_students(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> RecordResult<StudentPage> {
        let strategy = OffsetPage::new(STUDENT_ORDER_FIELD, page, size);
        if strategy.window().is_none() {
            return Ok(StudentPage {
                list: Vec::new(),
                total: None,
                page,
                size,
            });
        }

        let list = strategy
            .fetch(&self.store, STUDENTS_COLLECTION)?
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<Vec<Student>, _>>()?;
        let total = self.total_students()?;
        Ok(StudentPage {
            list,
            total: Some(total),
            page,
            size,
        })
    }

    pub fn get_student(&self, id: &str) -> RecordResult<Student> {
        load_record(&self.store, STUDENTS_COLLECTION, id)
    }

    /// Counts every stored student with a full collection scan.
    pub fn total_students(&self) -> RecordResult<u64> {
        Ok(self.store.count(STUDENTS_COLLECTION)?)
    }

    /// Creates a student under the next id of its grade.
    ///
    /// # Errors
    /// - `InvalidInput` when an identifying field is missing.
    /// - `DependencyMissing` when `classes/{grade}` was never provisioned.
    /// - `DuplicateId` under the `reject` policy when the id is taken.
    pub fn create_student(&self, input: NewStudent) -> RecordResult<Student> {
        let grade = input.validate()?;
        let group_key = grade_counter_key(grade);
        let sequence = CounterRepository::new(&self.store)
            .claim_next(&group_key, self.options.counter_max_attempts)?;

        let group_label = student_group_label(grade, &input.class_label);
        let id = allocate(
            RecordKind::Student,
            sequence,
            &input.date_of_birth,
            Some(group_label.as_str()),
        );
        let student = input.into_student(id, grade);
        write_new_record(
            &self.store,
            self.options.duplicate_id_policy,
            STUDENTS_COLLECTION,
            &student.id,
            encode_fields(&student)?,
        )?;

        info!(
            "event=student_create module=service status=ok id={} group={} sequence={}",
            student.id, group_key, sequence
        );
        Ok(student)
    }

    /// Merges `changes` into an existing student and returns the stored result.
    pub fn edit_student(&self, id: &str, changes: StudentChanges) -> RecordResult<Student> {
        let id = require_id(id)?;
        changes.validate()?;
        let changed_fields =
            merge_existing(&self.store, STUDENTS_COLLECTION, id, encode_fields(&changes)?)?;

        info!(
            "event=student_edit module=service status=ok id={} fields={}",
            id, changed_fields
        );
        load_record(&self.store, STUDENTS_COLLECTION, id)
    }

    /// Deletes a student; the grade counter is left as is.
    pub fn delete_student(&self, id: &str) -> RecordResult<()> {
        delete_record(&self.store, STUDENTS_COLLECTION, id)?;
        info!("event=student_delete module=service status=ok id={}", id.trim());
        Ok(())
    }
}

