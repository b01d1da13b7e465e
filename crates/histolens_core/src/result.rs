//! Classification output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::label::ClassLabel;

/// The outcome of one forward classification pass.
///
/// Serializes to the wire shape consumed by clients:
/// `{"prediction": "malignant", "confidence": 0.93, "probabilities": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// The arg-max class.
    #[serde(rename = "prediction")]
    pub label: ClassLabel,

    /// Probability of the arg-max class, in `[0, 1]`.
    pub confidence: f32,

    /// Probability per class; values sum to 1 within floating tolerance.
    pub probabilities: BTreeMap<ClassLabel, f32>,
}

impl ClassificationResult {
    /// Build a result from softmax probabilities in logit order.
    ///
    /// The label is the arg-max; on an exact tie the lower index wins.
    #[must_use]
    pub fn from_probabilities(probs: [f32; ClassLabel::COUNT]) -> Self {
        let mut best = 0usize;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        // best < COUNT, so the lookup cannot fail
        let label = ClassLabel::ALL[best];

        let mut probabilities = BTreeMap::new();
        for (i, l) in ClassLabel::ALL.iter().enumerate() {
            probabilities.insert(*l, probs[i]);
        }

        Self {
            label,
            confidence: probs[best],
            probabilities,
        }
    }

    /// Probability of the given class.
    #[must_use]
    pub fn probability(&self, label: ClassLabel) -> f32 {
        self.probabilities.get(&label).copied().unwrap_or(0.0)
    }
}
