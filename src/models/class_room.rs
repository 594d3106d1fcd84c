// src/models/class_room.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'classes' table. A class belongs to exactly one teacher.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ClassRoom {
    pub id: i64,
    pub name: String,
    pub teacher_id: i64,
}
