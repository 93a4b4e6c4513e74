//! Record identifier allocation.
//!
//! # Responsibility
//! - Derive human-readable record ids from a claimed sequence number.
//!
//! # Invariants
//! - `allocate` is pure: identical inputs always yield the identical id.
//! - Two ids of the same kind differ whenever their sequence numbers differ.
//! - `date_of_birth` is not validated; malformed text flows into the id.

use serde::{Deserialize, Serialize};

/// Joins id segments.
pub const ID_SEPARATOR: char = '-';

/// Record kind encoded as the identifier prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Student,
    Teacher,
}

impl RecordKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Student => "S",
            Self::Teacher => "T",
        }
    }
}

/// Builds the identifier for a new record.
///
/// - Student: `S-{group_label}-{yy}-{seq:04}`, see [`student_group_label`]
/// - Teacher: `T-{yy}-{seq:04}` (`group_label` is ignored)
///
/// `yy` is the birth-year fragment, see [`birth_year_fragment`].
pub fn allocate(
    kind: RecordKind,
    sequence_number: u64,
    date_of_birth: &str,
    group_label: Option<&str>,
) -> String {
    let year = birth_year_fragment(date_of_birth);
    match kind {
        RecordKind::Student => format!(
            "{}-{}-{year}-{sequence_number:04}",
            kind.prefix(),
            group_label.unwrap_or_default()
        ),
        RecordKind::Teacher => format!("{}-{year}-{sequence_number:04}", kind.prefix()),
    }
}

/// Group label embedded in student ids: `{grade}-{class_label}`.
///
/// The grade is the counter group, so students of different grades never
/// share an id even when their class labels match.
pub fn student_group_label(grade: i64, class_label: &str) -> String {
    format!("{grade}{ID_SEPARATOR}{class_label}")
}

/// Returns the last two characters of the year part of `date_of_birth`.
///
/// The year part is everything before the first `-`, so `2010-01-01` yields
/// `10`. Inputs shorter than two characters are returned whole.
pub fn birth_year_fragment(date_of_birth: &str) -> &str {
    let year = date_of_birth
        .split(ID_SEPARATOR)
        .next()
        .unwrap_or(date_of_birth)
        .trim();
    match year.char_indices().rev().nth(1) {
        Some((start, _)) => &year[start..],
        None => year,
    }
}

#[cfg(test)]
mod tests {
    use super::{allocate, birth_year_fragment, student_group_label, RecordKind};

    #[test]
    fn year_fragment_takes_last_two_year_digits() {
        assert_eq!(birth_year_fragment("2010-01-01"), "10");
        assert_eq!(birth_year_fragment("1987"), "87");
    }

    #[test]
    fn year_fragment_passes_malformed_dates_through() {
        assert_eq!(birth_year_fragment("01/02/1999"), "99");
        assert_eq!(birth_year_fragment("x"), "x");
        assert_eq!(birth_year_fragment(""), "");
    }

    #[test]
    fn teacher_id_ignores_group_label() {
        assert_eq!(
            allocate(RecordKind::Teacher, 7, "1980-05-02", Some("5A")),
            allocate(RecordKind::Teacher, 7, "1980-05-02", None)
        );
    }

    #[test]
    fn wide_sequence_numbers_are_not_truncated() {
        assert_eq!(
            allocate(RecordKind::Student, 123_456, "2011-03-04", Some("6-B")),
            "S-6-B-11-123456"
        );
    }

    #[test]
    fn allocate_is_deterministic() {
        let label = student_group_label(5, "5A");
        for kind in [RecordKind::Student, RecordKind::Teacher] {
            assert_eq!(
                allocate(kind, 3, "2010-01-01", Some(label.as_str())),
                allocate(kind, 3, "2010-01-01", Some(label.as_str()))
            );
        }
        assert_eq!(
            allocate(RecordKind::Student, 3, "2010-01-01", Some(label.as_str())),
            "S-5-5A-10-0003"
        );
        assert_eq!(allocate(RecordKind::Teacher, 3, "1980-01-01", None), "T-80-0003");
    }

    #[test]
    fn same_class_label_in_two_grades_gives_distinct_ids() {
        let fifth = student_group_label(5, "A");
        let sixth = student_group_label(6, "A");
        assert_ne!(
            allocate(RecordKind::Student, 0, "2010-01-01", Some(fifth.as_str())),
            allocate(RecordKind::Student, 0, "2010-01-01", Some(sixth.as_str()))
        );
    }
}
