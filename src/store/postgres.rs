// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{GradeCommit, ProgressionStore};
use crate::{
    engine::scope::ScopeKey,
    error::AppError,
    models::{
        class_room::ClassRoom,
        grade::{Grade, ScoredGrade},
        item::{GradableItem, ItemKind},
        notification::{NewNotification, Notification},
        student::Student,
    },
};

/// Helper struct for fetching items; `kind` is stored as TEXT.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    title: String,
    max_score: f64,
    class_id: i64,
    kind: String,
    reward: Option<i64>,
}

impl TryFrom<ItemRow> for GradableItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let kind = ItemKind::parse(&row.kind).ok_or_else(|| {
            AppError::InternalServerError(format!("Unknown item kind '{}'", row.kind))
        })?;
        Ok(GradableItem {
            id: row.id,
            title: row.title,
            max_score: row.max_score,
            class_id: row.class_id,
            kind,
            reward: row.reward,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScoredRow {
    student_id: i64,
    score: f64,
    kind: String,
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clause restricting `s` (students) / `c` (classes) to a scope.
fn push_student_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: ScopeKey) {
    match scope {
        ScopeKey::Global => {}
        ScopeKey::Teacher(teacher_id) => {
            builder.push(" WHERE c.teacher_id = ");
            builder.push_bind(teacher_id);
        }
        ScopeKey::Class(class_id) => {
            builder.push(" WHERE s.class_id = ");
            builder.push_bind(class_id);
        }
    }
}

const ITEM_COLUMNS: &str = "id, title, max_score, class_id, kind, reward";

#[async_trait]
impl ProgressionStore for PgStore {
    async fn find_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT id, name, avatar_url, teacher_id, class_id FROM students WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    async fn find_item(&self, id: i64) -> Result<Option<GradableItem>, AppError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM gradable_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(GradableItem::try_from).transpose()
    }

    async fn find_class(&self, id: i64) -> Result<Option<ClassRoom>, AppError> {
        let class = sqlx::query_as::<_, ClassRoom>(
            "SELECT id, name, teacher_id FROM classes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(class)
    }

    async fn students_in_scope(&self, scope: ScopeKey) -> Result<Vec<Student>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT s.id, s.name, s.avatar_url, s.teacher_id, s.class_id
             FROM students s
             JOIN classes c ON c.id = s.class_id",
        );
        push_student_scope(&mut builder, scope);
        builder.push(" ORDER BY s.id");

        let students = builder
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load students for {}: {:?}", scope, e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(students)
    }

    async fn grades_for_scope(&self, scope: ScopeKey) -> Result<Vec<ScoredGrade>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT g.student_id, g.score, i.kind
             FROM grades g
             JOIN gradable_items i ON i.id = g.item_id
             JOIN students s ON s.id = g.student_id
             JOIN classes c ON c.id = s.class_id",
        );
        push_student_scope(&mut builder, scope);

        let rows = builder
            .build_query_as::<ScoredRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load grades for {}: {:?}", scope, e);
                AppError::InternalServerError(e.to_string())
            })?;

        rows.into_iter()
            .map(|row| {
                let kind = ItemKind::parse(&row.kind).ok_or_else(|| {
                    AppError::InternalServerError(format!("Unknown item kind '{}'", row.kind))
                })?;
                Ok(ScoredGrade {
                    student_id: row.student_id,
                    score: row.score,
                    kind,
                })
            })
            .collect()
    }

    async fn classes_in_scope(&self, scope: ScopeKey) -> Result<Vec<ClassRoom>, AppError> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT c.id, c.name, c.teacher_id FROM classes c");
        match scope {
            ScopeKey::Global => {}
            ScopeKey::Teacher(teacher_id) => {
                builder.push(" WHERE c.teacher_id = ");
                builder.push_bind(teacher_id);
            }
            ScopeKey::Class(class_id) => {
                builder.push(" WHERE c.id = ");
                builder.push_bind(class_id);
            }
        }
        builder.push(" ORDER BY c.id");

        let classes = builder
            .build_query_as::<ClassRoom>()
            .fetch_all(&self.pool)
            .await?;

        Ok(classes)
    }

    async fn snapshot_positions(&self, scope: ScopeKey) -> Result<HashMap<i64, i64>, AppError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT student_id, position FROM rank_snapshots WHERE scope_key = $1",
        )
        .bind(scope.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn scope_version(&self, scope: ScopeKey) -> Result<i64, AppError> {
        let version = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM scope_versions WHERE scope_key = $1",
        )
        .bind(scope.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(version.unwrap_or(0))
    }

    async fn commit_grade(&self, commit: GradeCommit) -> Result<Grade, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        for snapshot in &commit.snapshots {
            let key = snapshot.scope.to_string();

            // Compare-and-bump. A concurrent writer holding the row makes this
            // statement wait, then re-check the version it committed.
            let bumped = sqlx::query(
                r#"
                INSERT INTO scope_versions (scope_key, version)
                VALUES ($1, $3)
                ON CONFLICT (scope_key) DO UPDATE SET version = EXCLUDED.version
                WHERE scope_versions.version = $2
                "#,
            )
            .bind(&key)
            .bind(snapshot.expected_version)
            .bind(snapshot.expected_version + 1)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if bumped == 0 {
                // Dropping `tx` rolls back anything written for earlier scopes.
                return Err(AppError::ConcurrencyConflict(format!(
                    "scope {} moved past version {}",
                    key, snapshot.expected_version
                )));
            }

            sqlx::query("DELETE FROM rank_snapshots WHERE scope_key = $1")
                .bind(&key)
                .execute(&mut *tx)
                .await?;

            if !snapshot.positions.is_empty() {
                let mut insert = QueryBuilder::<Postgres>::new(
                    "INSERT INTO rank_snapshots (scope_key, student_id, position) ",
                );
                insert.push_values(&snapshot.positions, |mut row, (student_id, position)| {
                    row.push_bind(key.clone())
                        .push_bind(*student_id)
                        .push_bind(*position);
                });
                insert.build().execute(&mut *tx).await?;
            }
        }

        let grade = sqlx::query_as::<_, Grade>(
            r#"
            INSERT INTO grades (student_id, item_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, item_id) DO UPDATE SET
                score = EXCLUDED.score,
                updated_at = NOW()
            RETURNING id, student_id, item_id, score, updated_at
            "#,
        )
        .bind(commit.student_id)
        .bind(commit.item_id)
        .bind(commit.score)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert grade: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(grade)
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, AppError> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (from_id, student_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, from_id, student_id, content, created_at
            "#,
        )
        .bind(notification.from_id)
        .bind(notification.student_id)
        .bind(notification.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn grades_for_class(&self, class_id: i64) -> Result<Vec<Grade>, AppError> {
        let grades = sqlx::query_as::<_, Grade>(
            r#"
            SELECT g.id, g.student_id, g.item_id, g.score, g.updated_at
            FROM grades g
            JOIN gradable_items i ON i.id = g.item_id
            WHERE i.class_id = $1
            ORDER BY g.id
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grades)
    }

    async fn items_for_class(&self, class_id: i64) -> Result<Vec<GradableItem>, AppError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM gradable_items WHERE class_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GradableItem::try_from).collect()
    }
}
