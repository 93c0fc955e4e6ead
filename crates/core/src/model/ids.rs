use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a drill attempt.
///
/// Assigned by the question service; opaque to the engine.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrillId(String);

impl DrillId {
    /// Creates a new `DrillId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Unique identifier for a question.
///
/// Keys the highlight map; an empty id never stores highlights.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DrillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrillId({})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for DrillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DrillId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drill_id_display_roundtrip() {
        let id = DrillId::new("dr-a3f2b9");
        assert_eq!(id.to_string(), "dr-a3f2b9");
        assert_eq!(id.as_str(), "dr-a3f2b9");
    }

    #[test]
    fn question_id_empty_is_detected() {
        assert!(QuestionId::new("").is_empty());
        assert!(!QuestionId::new("q-1").is_empty());
    }

    #[test]
    fn ids_order_lexicographically() {
        assert!(QuestionId::new("q-1") < QuestionId::new("q-2"));
    }
}
