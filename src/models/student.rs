// src/models/student.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'students' table.
///
/// Rank snapshots are not stored here: they live per scope in `rank_snapshots`
/// so a class-local position is never read back as a global one.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub teacher_id: i64,
    pub class_id: i64,
}
