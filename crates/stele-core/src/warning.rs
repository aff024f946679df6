//! Unsafe-operation warnings.
//!
//! Destructive changes rejected by a safety probe are skipped, not failed;
//! each skip records a [`Warning`] that ends up as a SQL comment at the top
//! of the emitted script. The set is an explicit per-run value threaded
//! through the differ and returned with the plan, so independent runs never
//! see each other's warnings.

use serde::{Deserialize, Serialize};

/// One recorded warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable de-duplication key (`identity:dbo.Order.Id`).
    pub key: String,
    /// Human-readable message, also emitted as a script comment.
    pub message: String,
}

/// Insertion-ordered, de-duplicated warning collection for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningSet {
    warnings: Vec<Warning>,
}

impl WarningSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning unless one with the same key already exists.
    ///
    /// Returns true when the warning was newly inserted.
    pub fn record(&mut self, key: impl Into<String>, message: impl Into<String>) -> bool {
        let key = key.into();
        if self.warnings.iter().any(|w| w.key == key) {
            return false;
        }
        self.warnings.push(Warning {
            key,
            message: message.into(),
        });
        true
    }

    /// Returns the recorded warnings in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether any warning was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of distinct warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Consumes the set, returning the warnings.
    #[must_use]
    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}
