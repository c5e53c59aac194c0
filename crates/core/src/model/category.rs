use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, is_valid_slug};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CategoryError {
    #[error("category id cannot be empty")]
    EmptyId,

    #[error("category id must not contain whitespace: {0:?}")]
    InvalidId(String),

    #[error("category name cannot be empty")]
    EmptyName,
}

/// Serialized shape of a category as it appears in catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl CategoryDraft {
    /// Validate the draft into an immutable `Category`.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError` if the id or name is blank, or the id contains
    /// whitespace.
    pub fn validate(self) -> Result<Category, CategoryError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(CategoryError::EmptyId);
        }
        if !is_valid_slug(id) {
            return Err(CategoryError::InvalidId(id.to_owned()));
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        Ok(Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            icon: self.icon,
        })
    }
}

/// A group of related exercises (e.g. articulation, fluency).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    description: String,
    icon: String,
}

impl Category {
    #[must_use]
    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_trims_fields() {
        let category = CategoryDraft {
            id: " fluency ".into(),
            name: " Fluency ".into(),
            description: "Smooth, paced speech".into(),
            icon: "🌊".into(),
        }
        .validate()
        .unwrap();

        assert_eq!(category.id().as_str(), "fluency");
        assert_eq!(category.name(), "Fluency");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = CategoryDraft {
            id: "x".into(),
            name: "  ".into(),
            description: String::new(),
            icon: String::new(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, CategoryError::EmptyName);
    }

    #[test]
    fn spaced_id_is_rejected() {
        let err = CategoryDraft {
            id: "sound drills".into(),
            name: "Sound drills".into(),
            description: String::new(),
            icon: String::new(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, CategoryError::InvalidId("sound drills".into()));
    }
}
