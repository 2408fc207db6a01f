//! Input checks for task drafts and patches.
//!
//! The reducer accepts whatever it is given. Callers run these checks first
//! and only build an `Add` or `Update` action when they pass.

use crate::types::{TaskDraft, TaskPatch};
use thiserror::Error;

/// Why a draft or patch was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trimming
    #[error("Task title cannot be empty")]
    EmptyTitle,

    /// Title is shorter than the configured minimum
    #[error("Task title must be at least {min} characters")]
    TitleTooShort {
        /// Minimum length
        min: usize,
    },

    /// Title is longer than the configured maximum
    #[error("Task title too long (max {max} characters)")]
    TitleTooLong {
        /// Maximum length
        max: usize,
    },

    /// Description is shorter than the configured minimum
    #[error("Task description must be at least {min} characters")]
    DescriptionTooShort {
        /// Minimum length
        min: usize,
    },

    /// Patch changes nothing
    #[error("Nothing to update")]
    EmptyPatch,
}

/// Length limits, counted in characters of the trimmed text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationRules {
    /// Shortest acceptable title
    pub min_title_len: usize,
    /// Longest acceptable title
    pub max_title_len: usize,
    /// Shortest acceptable description (0 allows an empty one)
    pub min_description_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_title_len: 3,
            max_title_len: 100,
            min_description_len: 0,
        }
    }
}

impl ValidationRules {
    /// Checks a title
    ///
    /// # Errors
    ///
    /// Returns the first rule the title breaks.
    pub fn check_title(&self, title: &str) -> Result<(), ValidationError> {
        let len = title.trim().chars().count();
        if len == 0 {
            return Err(ValidationError::EmptyTitle);
        }
        if len < self.min_title_len {
            return Err(ValidationError::TitleTooShort {
                min: self.min_title_len,
            });
        }
        if len > self.max_title_len {
            return Err(ValidationError::TitleTooLong {
                max: self.max_title_len,
            });
        }
        Ok(())
    }

    /// Checks a description
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DescriptionTooShort`] when below the minimum.
    pub fn check_description(&self, description: &str) -> Result<(), ValidationError> {
        if description.trim().chars().count() < self.min_description_len {
            return Err(ValidationError::DescriptionTooShort {
                min: self.min_description_len,
            });
        }
        Ok(())
    }

    /// Checks a new task before it is added
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn validate_draft(&self, draft: &TaskDraft) -> Result<(), ValidationError> {
        self.check_title(&draft.title)?;
        self.check_description(&draft.description)
    }

    /// Checks the fields a patch sets
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPatch`] for a patch with no fields, or the
    /// first rule a present field breaks.
    pub fn validate_patch(&self, patch: &TaskPatch) -> Result<(), ValidationError> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(title) = &patch.title {
            self.check_title(title)?;
        }
        if let Some(description) = &patch.description {
            self.check_description(description)?;
        }
        Ok(())
    }
}
