use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TutorialId(pub i64);

impl std::fmt::Display for TutorialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted tutorial. `title` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutorial {
    pub id: TutorialId,
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for an insert, after request validation and defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTutorial {
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
}

/// Partial replacement of a tutorial's fields. `None` leaves a field untouched;
/// `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub published: Option<bool>,
}

impl TutorialChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.published.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialFilter {
    /// Case-sensitive substring the title must contain.
    pub title_contains: Option<String>,
    pub published: Option<bool>,
}

impl TutorialFilter {
    pub fn title_contains(title: impl Into<String>) -> Self {
        Self {
            title_contains: Some(title.into()),
            published: None,
        }
    }

    pub fn published() -> Self {
        Self {
            title_contains: None,
            published: Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyFilter {
    ById(TutorialId),
    All,
}
