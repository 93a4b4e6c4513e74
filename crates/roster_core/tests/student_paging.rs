use roster_core::{CounterRepository, MemoryDocumentStore, NewStudent, StudentService};
use serde_json::Map;

fn seeded_store(count: usize) -> MemoryDocumentStore {
    let store = MemoryDocumentStore::new();
    CounterRepository::new(&store).provision("9", 0).unwrap();
    let service = StudentService::new(&store);

    // Insert in reverse so creation order differs from sort order.
    for index in (0..count).rev() {
        service
            .create_student(NewStudent {
                first_name: "Sam".to_string(),
                last_name: format!("L{index:02}"),
                gender: "male".to_string(),
                date_of_birth: "2008-09-30".to_string(),
                email: format!("l{index:02}@school.test"),
                grade: Some(9),
                class_label: "9B".to_string(),
                extra: Map::new(),
            })
            .unwrap();
    }
    store
}

fn last_names(page: &roster_core::StudentPage) -> Vec<String> {
    page.list
        .iter()
        .map(|student| student.last_name.clone())
        .collect()
}

#[test]
fn second_page_returns_positions_ten_to_nineteen() {
    let store = seeded_store(25);
    let service = StudentService::new(&store);

    let page = service.list_students(Some(2), Some(10)).unwrap();

    let expected: Vec<String> = (10..20).map(|index| format!("L{index:02}")).collect();
    assert_eq!(last_names(&page), expected);
    assert_eq!(page.total, Some(25));
    assert_eq!(page.page, Some(2));
    assert_eq!(page.size, Some(10));
}

#[test]
fn last_page_is_partial_and_past_the_end_is_empty() {
    let store = seeded_store(25);
    let service = StudentService::new(&store);

    let last = service.list_students(Some(3), Some(10)).unwrap();
    assert_eq!(last.list.len(), 5);
    assert_eq!(last_names(&last).first().map(String::as_str), Some("L20"));

    let beyond = service.list_students(Some(4), Some(10)).unwrap();
    assert!(beyond.list.is_empty());
    assert_eq!(beyond.total, Some(25));
}

#[test]
fn unusable_page_parameters_return_empty_without_error() {
    let store = seeded_store(5);
    let service = StudentService::new(&store);

    for (page, size) in [
        (Some(0), Some(10)),
        (Some(1), Some(0)),
        (Some(-1), Some(10)),
        (None, Some(10)),
        (Some(1), None),
    ] {
        let result = service.list_students(page, size).unwrap();
        assert!(result.list.is_empty(), "page={page:?} size={size:?}");
        assert_eq!(result.total, None);
    }
}

#[test]
fn pages_do_not_overlap() {
    let store = seeded_store(7);
    let service = StudentService::new(&store);

    let mut seen = Vec::new();
    for page in 1..=4 {
        seen.extend(last_names(&service.list_students(Some(page), Some(2)).unwrap()));
    }

    let expected: Vec<String> = (0..7).map(|index| format!("L{index:02}")).collect();
    assert_eq!(seen, expected);
}
