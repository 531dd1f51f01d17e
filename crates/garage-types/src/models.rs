use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of image references a car may hold at rest.
pub const MAX_IMAGES: usize = 10;

/// A car listing owned by exactly one user.
///
/// `images` holds opaque storage references (e.g. `uploads/1718000000000-front.jpg`)
/// in upload order. The server never exposes a record to anyone but `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a car that has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCar {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

/// Scalar fields supplied with an update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CarFields {
    /// Apply "replace if provided, else keep" semantics. Empty values never
    /// clear an existing one.
    pub fn apply_to(self, car: &mut CarRecord) {
        if let Some(title) = self.title.filter(|t| !t.is_empty()) {
            car.title = title;
        }
        if let Some(description) = self.description.filter(|d| !d.is_empty()) {
            car.description = Some(description);
        }
        if let Some(tags) = self.tags.filter(|t| !t.is_empty()) {
            car.tags = tags;
        }
    }
}

/// Split comma-joined tag text into trimmed, non-empty labels.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
