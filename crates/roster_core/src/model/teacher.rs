//! Teacher record model.
//!
//! Teachers share the single `total_teacher` counter, so their ids carry no
//! group label.

use super::{reject_blank, require, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection holding teacher documents.
pub const TEACHERS_COLLECTION: &str = "teachers";

/// Stored teacher record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub email: String,
    /// Subject, phone and other free-form attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input for creating a teacher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTeacher {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewTeacher {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        require("date_of_birth", &self.date_of_birth)?;
        require("email", &self.email)?;
        Ok(())
    }

    pub fn into_teacher(self, id: String) -> Teacher {
        let mut extra = self.extra;
        extra.remove("id");
        Teacher {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            email: self.email,
            extra,
        }
    }
}

/// Partial edit for an existing teacher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeacherChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        reject_blank("first_name", self.first_name.as_ref())?;
        reject_blank("last_name", self.last_name.as_ref())?;
        reject_blank("date_of_birth", self.date_of_birth.as_ref())?;
        reject_blank("email", self.email.as_ref())?;
        Ok(())
    }
}
