//! Student record model.
//!
//! # Invariants
//! - `id` is assigned by the student service and never part of an edit.
//! - Unknown caller fields survive in `extra` and are stored alongside.

use super::{reject_blank, reject_negative, reject_separator, require, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection holding student documents.
pub const STUDENTS_COLLECTION: &str = "students";
/// Sort key used by student listing.
pub const STUDENT_ORDER_FIELD: &str = "last_name";

/// Stored student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub email: String,
    /// Grade number; also selects the counter group.
    pub grade: i64,
    /// Class label embedded in the id, e.g. `5A`.
    #[serde(alias = "Class")]
    pub class_label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input for creating a student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub email: String,
    pub grade: Option<i64>,
    #[serde(alias = "Class")]
    pub class_label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewStudent {
    /// Presence checks for every identifying field.
    ///
    /// `grade` and `class_label` are embedded in the id, so the grade must be
    /// non-negative and the label free of `-`.
    pub fn validate(&self) -> Result<i64, ValidationError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        require("gender", &self.gender)?;
        require("date_of_birth", &self.date_of_birth)?;
        require("email", &self.email)?;
        require("class_label", &self.class_label)?;
        reject_separator("class_label", &self.class_label)?;
        let grade = self.grade.ok_or(ValidationError::MissingField("grade"))?;
        reject_negative("grade", grade)?;
        Ok(grade)
    }

    /// Builds the stored record under an allocated id.
    pub fn into_student(self, id: String, grade: i64) -> Student {
        let mut extra = self.extra;
        extra.remove("id");
        Student {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            email: self.email,
            grade,
            class_label: self.class_label,
            extra,
        }
    }
}

/// Partial edit for an existing student. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<i64>,
    #[serde(alias = "Class", skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StudentChanges {
    /// Rejects blank replacements for identifying fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        reject_blank("first_name", self.first_name.as_ref())?;
        reject_blank("last_name", self.last_name.as_ref())?;
        reject_blank("gender", self.gender.as_ref())?;
        reject_blank("date_of_birth", self.date_of_birth.as_ref())?;
        reject_blank("email", self.email.as_ref())?;
        reject_blank("class_label", self.class_label.as_ref())?;
        if let Some(label) = self.class_label.as_deref() {
            reject_separator("class_label", label)?;
        }
        if let Some(grade) = self.grade {
            reject_negative("grade", grade)?;
        }
        Ok(())
    }
}
