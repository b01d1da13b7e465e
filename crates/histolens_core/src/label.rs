//! Diagnostic class labels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The two diagnostic classes of the classifier.
///
/// The order matches the logit order of the trained networks: index 0 is
/// benign, index 1 is malignant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    /// Non-cancerous tissue.
    Benign,
    /// Cancerous tissue.
    Malignant,
}

impl ClassLabel {
    /// Number of classes in the label space.
    pub const COUNT: usize = 2;

    /// All labels in logit order.
    pub const ALL: [ClassLabel; 2] = [ClassLabel::Benign, ClassLabel::Malignant];

    /// Map a logit index to its label.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is outside the two-class space.
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(ClassLabel::Benign),
            1 => Ok(ClassLabel::Malignant),
            other => Err(CoreError::UnknownClassIndex(other)),
        }
    }

    /// The logit index of this label.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            ClassLabel::Benign => 0,
            ClassLabel::Malignant => 1,
        }
    }

    /// Lowercase name as used in serialized results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Benign => "benign",
            ClassLabel::Malignant => "malignant",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
