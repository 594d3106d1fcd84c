// src/store/mod.rs

//! Persistence boundary of the engine.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    engine::scope::ScopeKey,
    error::AppError,
    models::{
        class_room::ClassRoom,
        grade::{Grade, ScoredGrade},
        item::GradableItem,
        notification::{NewNotification, Notification},
        student::Student,
    },
};

pub use memory::{MemoryStore, Seed};
pub use postgres::PgStore;

/// Positions of one scope, captured against a known scope version.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSnapshot {
    pub scope: ScopeKey,
    /// Version read before the positions were computed.
    pub expected_version: i64,
    /// `(student_id, position)` pairs.
    pub positions: Vec<(i64, i64)>,
}

/// Everything a grade write persists, applied as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeCommit {
    pub snapshots: Vec<ScopeSnapshot>,
    pub student_id: i64,
    pub item_id: i64,
    pub score: f64,
}

/// Storage operations the engine relies on.
///
/// Scope membership: `Class(c)` is every student of class `c`, `Teacher(t)` every
/// student in a class owned by `t`, `Global` every student.
#[async_trait]
pub trait ProgressionStore: Send + Sync {
    async fn find_student(&self, id: i64) -> Result<Option<Student>, AppError>;

    async fn find_item(&self, id: i64) -> Result<Option<GradableItem>, AppError>;

    async fn find_class(&self, id: i64) -> Result<Option<ClassRoom>, AppError>;

    async fn students_in_scope(&self, scope: ScopeKey) -> Result<Vec<Student>, AppError>;

    /// Every grade held by a student of the scope, whatever class the item is in.
    async fn grades_for_scope(&self, scope: ScopeKey) -> Result<Vec<ScoredGrade>, AppError>;

    async fn classes_in_scope(&self, scope: ScopeKey) -> Result<Vec<ClassRoom>, AppError>;

    /// Last snapshot of the scope as `student_id -> position`.
    async fn snapshot_positions(&self, scope: ScopeKey) -> Result<HashMap<i64, i64>, AppError>;

    /// Current version of the scope; 0 if it was never snapshotted.
    async fn scope_version(&self, scope: ScopeKey) -> Result<i64, AppError>;

    /// Atomically checks and bumps every scope version, replaces each scope's
    /// snapshot and upserts the grade.
    ///
    /// Returns `AppError::ConcurrencyConflict` without writing anything when any
    /// scope version moved since it was read.
    async fn commit_grade(&self, commit: GradeCommit) -> Result<Grade, AppError>;

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, AppError>;

    async fn grades_for_class(&self, class_id: i64) -> Result<Vec<Grade>, AppError>;

    async fn items_for_class(&self, class_id: i64) -> Result<Vec<GradableItem>, AppError>;
}
