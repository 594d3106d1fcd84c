// src/models/notification.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'notifications' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub from_id: Option<i64>,
    pub student_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub from_id: Option<i64>,
    pub student_id: i64,
    pub content: String,
}
