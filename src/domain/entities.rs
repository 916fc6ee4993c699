//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A good as stored in the `goods` table.
///
/// The JSON form is shared by HTTP responses and cache payloads, so a record
/// written to the cache decodes back to an identical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodRecord {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub description: String,
    pub priority: i32,
    /// Soft-delete flag. Removed goods stay retrievable by id.
    pub removed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl GoodRecord {
    pub fn is_active(&self) -> bool {
        !self.removed
    }

    pub fn key(&self) -> GoodKey {
        GoodKey {
            id: self.id,
            project_id: self.project_id,
        }
    }
}

/// Address of a good within its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoodKey {
    pub id: i32,
    pub project_id: i32,
}

impl GoodKey {
    pub fn new(id: i32, project_id: i32) -> Self {
        Self { id, project_id }
    }
}
