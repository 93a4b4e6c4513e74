use roster_core::{
    CounterRepository, Document, DocumentQuery, DocumentStore, DuplicateIdPolicy,
    MemoryDocumentStore, NewStudent, RecordOptions, RecordServiceError, SetMode, StoreResult,
    StudentChanges, StudentService, STUDENTS_COLLECTION,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

fn new_student(last_name: &str) -> NewStudent {
    NewStudent {
        first_name: "Ann".to_string(),
        last_name: last_name.to_string(),
        gender: "female".to_string(),
        date_of_birth: "2010-01-01".to_string(),
        email: format!("{}@school.test", last_name.to_lowercase()),
        grade: Some(5),
        class_label: "5A".to_string(),
        extra: Map::new(),
    }
}

fn provisioned_store(group: &str, total: u64) -> MemoryDocumentStore {
    let store = MemoryDocumentStore::new();
    CounterRepository::new(&store).provision(group, total).unwrap();
    store
}

fn counter_total(store: &MemoryDocumentStore, group: &str) -> u64 {
    CounterRepository::new(store)
        .get(group)
        .unwrap()
        .expect("counter should exist")
        .total
}

#[test]
fn create_embeds_pre_increment_counter_and_advances_it() {
    let store = provisioned_store("5", 3);
    let service = StudentService::new(&store);

    let student = service.create_student(new_student("Nguyen")).unwrap();

    assert_eq!(student.id, "S-5-5A-10-0003");
    assert_eq!(counter_total(&store, "5"), 4);
    assert_eq!(service.get_student(&student.id).unwrap(), student);
}

#[test]
fn sequential_creates_yield_distinct_ids() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);

    let ids: HashSet<String> = (0..12)
        .map(|index| {
            service
                .create_student(new_student(&format!("Student{index}")))
                .unwrap()
                .id
        })
        .collect();

    assert_eq!(ids.len(), 12);
    assert_eq!(service.total_students().unwrap(), 12);
}

#[test]
fn counter_grows_by_creates_regardless_of_deletes() {
    let store = provisioned_store("5", 10);
    let service = StudentService::new(&store);

    let first = service.create_student(new_student("One")).unwrap();
    service.delete_student(&first.id).unwrap();
    let second = service.create_student(new_student("Two")).unwrap();
    service.delete_student(&second.id).unwrap();
    service.create_student(new_student("Three")).unwrap();

    assert_eq!(counter_total(&store, "5"), 13);
    assert_eq!(service.total_students().unwrap(), 1);
}

#[test]
fn create_without_provisioned_counter_is_dependency_missing() {
    let store = MemoryDocumentStore::new();
    let service = StudentService::new(&store);

    let err = service.create_student(new_student("Orphan")).unwrap_err();

    assert!(matches!(
        err,
        RecordServiceError::DependencyMissing { ref group_key } if group_key == "5"
    ));
    assert_eq!(service.total_students().unwrap(), 0);
    assert!(CounterRepository::new(&store).get("5").unwrap().is_none());
}

#[test]
fn create_with_missing_fields_is_invalid_input() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);

    let mut no_grade = new_student("Grade");
    no_grade.grade = None;
    let mut blank_email = new_student("Email");
    blank_email.email = "   ".to_string();

    for input in [no_grade, blank_email] {
        let err = service.create_student(input).unwrap_err();
        assert!(matches!(err, RecordServiceError::InvalidInput(_)));
    }
    assert_eq!(counter_total(&store, "5"), 0);
}

#[test]
fn edit_merges_fields_and_keeps_id() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);
    let mut input = new_student("Lee");
    input.extra.insert("phone".to_string(), json!("555-0100"));
    let created = service.create_student(input).unwrap();

    let mut changes = StudentChanges {
        last_name: Some("Lee-Park".to_string()),
        grade: Some(6),
        ..StudentChanges::default()
    };
    changes
        .extra
        .insert("id".to_string(), json!("S-HACKED-00-9999"));
    let edited = service.edit_student(&created.id, changes).unwrap();

    assert_eq!(edited.id, created.id);
    assert_eq!(edited.last_name, "Lee-Park");
    assert_eq!(edited.grade, 6);
    assert_eq!(edited.first_name, created.first_name);
    assert_eq!(edited.extra.get("phone"), Some(&json!("555-0100")));
    assert!(service.get_student("S-HACKED-00-9999").is_err());
}

#[test]
fn edit_rejects_blank_id_blank_values_and_unknown_students() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);
    let created = service.create_student(new_student("Kim")).unwrap();

    let blank_id = service
        .edit_student(" ", StudentChanges::default())
        .unwrap_err();
    assert!(matches!(blank_id, RecordServiceError::InvalidInput(_)));

    let blank_value = StudentChanges {
        first_name: Some(String::new()),
        ..StudentChanges::default()
    };
    let err = service.edit_student(&created.id, blank_value).unwrap_err();
    assert!(matches!(err, RecordServiceError::InvalidInput(_)));

    let missing = service
        .edit_student("S-5-5A-10-0042", StudentChanges::default())
        .unwrap_err();
    assert!(matches!(missing, RecordServiceError::NotFound { .. }));
}

#[test]
fn delete_unknown_student_is_not_found() {
    let store = MemoryDocumentStore::new();
    let service = StudentService::new(&store);

    let err = service.delete_student("X").unwrap_err();

    assert!(matches!(
        err,
        RecordServiceError::NotFound { collection, ref id }
            if collection == STUDENTS_COLLECTION && id == "X"
    ));
}

#[test]
fn reset_counter_overwrites_under_last_write_wins() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);
    let first = service.create_student(new_student("First")).unwrap();

    CounterRepository::new(&store).provision("5", 0).unwrap();
    let second = service.create_student(new_student("Second")).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(service.total_students().unwrap(), 1);
    assert_eq!(service.get_student(&first.id).unwrap().last_name, "Second");
}

#[test]
fn reset_counter_fails_under_reject_policy() {
    let store = provisioned_store("5", 0);
    let options = RecordOptions {
        duplicate_id_policy: DuplicateIdPolicy::Reject,
        ..RecordOptions::default()
    };
    let service = StudentService::with_options(&store, options);
    let first = service.create_student(new_student("First")).unwrap();

    CounterRepository::new(&store).provision("5", 0).unwrap();
    let err = service.create_student(new_student("Second")).unwrap_err();

    assert!(matches!(err, RecordServiceError::DuplicateId(ref id) if *id == first.id));
    assert_eq!(service.get_student(&first.id).unwrap().last_name, "First");
    assert_eq!(counter_total(&store, "5"), 1);
}

#[test]
fn failed_record_write_burns_the_sequence_number() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);

    store.fail_writes_to(STUDENTS_COLLECTION);
    let err = service.create_student(new_student("Lost")).unwrap_err();
    assert!(matches!(err, RecordServiceError::StoreFailure(_)));
    assert_eq!(counter_total(&store, "5"), 1);

    store.restore_writes_to(STUDENTS_COLLECTION);
    let student = service.create_student(new_student("Kept")).unwrap();
    assert_eq!(student.id, "S-5-5A-10-0001");
    assert_eq!(service.total_students().unwrap(), 1);
}

#[test]
fn grades_keep_independent_counters() {
    let store = provisioned_store("5", 0);
    CounterRepository::new(&store).provision("6", 40).unwrap();
    let service = StudentService::new(&store);

    let mut sixth = new_student("Sixth");
    sixth.grade = Some(6);
    sixth.class_label = "6C".to_string();

    let fifth = service.create_student(new_student("Fifth")).unwrap();
    let sixth = service.create_student(sixth).unwrap();

    assert_eq!(fifth.id, "S-5-5A-10-0000");
    assert_eq!(sixth.id, "S-6-6C-10-0040");
    assert_eq!(counter_total(&store, "5"), 1);
    assert_eq!(counter_total(&store, "6"), 41);
}

#[test]
fn same_class_label_in_two_grades_never_collides() {
    let store = provisioned_store("5", 0);
    CounterRepository::new(&store).provision("6", 0).unwrap();
    let service = StudentService::new(&store);

    let mut fifth = new_student("Fifth");
    fifth.class_label = "A".to_string();
    let mut sixth = new_student("Sixth");
    sixth.class_label = "A".to_string();
    sixth.grade = Some(6);

    let fifth = service.create_student(fifth).unwrap();
    let sixth = service.create_student(sixth).unwrap();

    assert_eq!(fifth.id, "S-5-A-10-0000");
    assert_eq!(sixth.id, "S-6-A-10-0000");
    assert_eq!(service.total_students().unwrap(), 2);
    assert_eq!(service.get_student(&fifth.id).unwrap().last_name, "Fifth");
}

#[test]
fn create_rejects_values_that_break_id_segments() {
    let store = provisioned_store("5", 0);
    let service = StudentService::new(&store);

    let mut dashed = new_student("Dash");
    dashed.class_label = "5-A".to_string();
    let mut negative = new_student("Negative");
    negative.grade = Some(-5);

    for input in [dashed, negative] {
        let err = service.create_student(input).unwrap_err();
        assert!(matches!(err, RecordServiceError::InvalidInput(_)));
    }
    assert_eq!(counter_total(&store, "5"), 0);
}

/// Removes `id` from the inner store just before any write reaches it.
struct DeletedBeforeWrite<'a> {
    inner: &'a MemoryDocumentStore,
    id: String,
}

impl DocumentStore for DeletedBeforeWrite<'_> {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id)
    }

    fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        self.inner.query(query)
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        mode: SetMode,
    ) -> StoreResult<()> {
        self.inner.delete(collection, &self.id)?;
        self.inner.set(collection, id, fields, mode)
    }

    fn create(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<bool> {
        self.inner.create(collection, id, fields)
    }

    fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Map<String, Value>,
    ) -> StoreResult<bool> {
        self.inner.delete(collection, &self.id)?;
        self.inner
            .compare_and_set(collection, id, field, expected, fields)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.inner.delete(collection, id)
    }

    fn count(&self, collection: &str) -> StoreResult<u64> {
        self.inner.count(collection)
    }
}

#[test]
fn edit_racing_a_delete_is_not_found_and_leaves_no_partial_record() {
    let store = provisioned_store("5", 0);
    let created = StudentService::new(&store)
        .create_student(new_student("Gone"))
        .unwrap();

    let racing = DeletedBeforeWrite {
        inner: &store,
        id: created.id.clone(),
    };
    let changes = StudentChanges {
        last_name: Some("X".to_string()),
        ..StudentChanges::default()
    };
    let err = StudentService::new(&racing)
        .edit_student(&created.id, changes)
        .unwrap_err();

    assert!(matches!(err, RecordServiceError::NotFound { ref id, .. } if *id == created.id));
    assert!(store.get(STUDENTS_COLLECTION, &created.id).unwrap().is_none());
    let page = StudentService::new(&store)
        .list_students(Some(1), Some(10))
        .unwrap();
    assert!(page.list.is_empty());
    assert_eq!(page.total, Some(0));
}
