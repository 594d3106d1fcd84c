// src/store/memory.rs

//! In-process store used when no database is configured, and by the test suite.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{GradeCommit, ProgressionStore};
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

/// Initial content of a `MemoryStore`, usually read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub classes: Vec<ClassRoom>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub items: Vec<GradableItem>,
    #[serde(default)]
    pub grades: Vec<SeedGrade>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedGrade {
    pub student_id: i64,
    pub item_id: i64,
    pub score: f64,
}

#[derive(Debug, Default)]
struct Inner {
    classes: BTreeMap<i64, ClassRoom>,
    students: BTreeMap<i64, Student>,
    items: BTreeMap<i64, GradableItem>,
    grades: BTreeMap<(i64, i64), Grade>,
    snapshots: HashMap<ScopeKey, HashMap<i64, i64>>,
    versions: HashMap<ScopeKey, i64>,
    notifications: Vec<Notification>,
    next_grade_id: i64,
}

impl Inner {
    fn in_scope(&self, student: &Student, scope: ScopeKey) -> bool {
        match scope {
            ScopeKey::Global => true,
            ScopeKey::Class(class_id) => student.class_id == class_id,
            ScopeKey::Teacher(teacher_id) => self
                .classes
                .get(&student.class_id)
                .is_some_and(|c| c.teacher_id == teacher_id),
        }
    }

    fn upsert_grade(&mut self, student_id: i64, item_id: i64, score: f64) -> Grade {
        let now = chrono::Utc::now();
        if let Some(existing) = self.grades.get_mut(&(student_id, item_id)) {
            existing.score = score;
            existing.updated_at = now;
            return existing.clone();
        }

        self.next_grade_id += 1;
        let grade = Grade {
            id: self.next_grade_id,
            student_id,
            item_id,
            score,
            updated_at: now,
        };
        self.grades.insert((student_id, item_id), grade.clone());
        grade
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let mut inner = Inner::default();
        inner.classes = seed.classes.into_iter().map(|c| (c.id, c)).collect();
        inner.students = seed.students.into_iter().map(|s| (s.id, s)).collect();
        inner.items = seed.items.into_iter().map(|i| (i.id, i)).collect();
        for grade in seed.grades {
            inner.upsert_grade(grade.student_id, grade.item_id, grade.score);
        }

        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Every notification created so far, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.read().await.notifications.clone()
    }
}

#[async_trait]
impl ProgressionStore for MemoryStore {
    async fn find_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        Ok(self.inner.read().await.students.get(&id).cloned())
    }

    async fn find_item(&self, id: i64) -> Result<Option<GradableItem>, AppError> {
        Ok(self.inner.read().await.items.get(&id).cloned())
    }

    async fn find_class(&self, id: i64) -> Result<Option<ClassRoom>, AppError> {
        Ok(self.inner.read().await.classes.get(&id).cloned())
    }

    async fn students_in_scope(&self, scope: ScopeKey) -> Result<Vec<Student>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .students
            .values()
            .filter(|s| inner.in_scope(s, scope))
            .cloned()
            .collect())
    }

    async fn grades_for_scope(&self, scope: ScopeKey) -> Result<Vec<ScoredGrade>, AppError> {
        let inner = self.inner.read().await;
        let mut scored = Vec::new();
        for grade in inner.grades.values() {
            let Some(student) = inner.students.get(&grade.student_id) else {
                continue;
            };
            if !inner.in_scope(student, scope) {
                continue;
            }
            let Some(item) = inner.items.get(&grade.item_id) else {
                continue;
            };
            scored.push(ScoredGrade {
                student_id: grade.student_id,
                score: grade.score,
                kind: item.kind,
            });
        }
        Ok(scored)
    }

    async fn classes_in_scope(&self, scope: ScopeKey) -> Result<Vec<ClassRoom>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .classes
            .values()
            .filter(|c| match scope {
                ScopeKey::Global => true,
                ScopeKey::Teacher(teacher_id) => c.teacher_id == teacher_id,
                ScopeKey::Class(class_id) => c.id == class_id,
            })
            .cloned()
            .collect())
    }

    async fn snapshot_positions(&self, scope: ScopeKey) -> Result<HashMap<i64, i64>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .snapshots
            .get(&scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn scope_version(&self, scope: ScopeKey) -> Result<i64, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .versions
            .get(&scope)
            .copied()
            .unwrap_or(0))
    }

    async fn commit_grade(&self, commit: GradeCommit) -> Result<Grade, AppError> {
        let mut inner = self.inner.write().await;

        // Check every version before touching anything.
        for snapshot in &commit.snapshots {
            let current = inner.versions.get(&snapshot.scope).copied().unwrap_or(0);
            if current != snapshot.expected_version {
                return Err(AppError::ConcurrencyConflict(format!(
                    "scope {} is at version {}, expected {}",
                    snapshot.scope, current, snapshot.expected_version
                )));
            }
        }

        for snapshot in commit.snapshots {
            *inner.versions.entry(snapshot.scope).or_insert(0) += 1;
            inner
                .snapshots
                .insert(snapshot.scope, snapshot.positions.into_iter().collect());
        }

        Ok(inner.upsert_grade(commit.student_id, commit.item_id, commit.score))
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, AppError> {
        let mut inner = self.inner.write().await;
        let created = Notification {
            id: inner.notifications.len() as i64 + 1,
            from_id: notification.from_id,
            student_id: notification.student_id,
            content: notification.content,
            created_at: chrono::Utc::now(),
        };
        inner.notifications.push(created.clone());
        Ok(created)
    }

    async fn grades_for_class(&self, class_id: i64) -> Result<Vec<Grade>, AppError> {
        let inner = self.inner.read().await;
        let mut grades: Vec<Grade> = inner
            .grades
            .values()
            .filter(|g| {
                inner
                    .items
                    .get(&g.item_id)
                    .is_some_and(|item| item.class_id == class_id)
            })
            .cloned()
            .collect();
        grades.sort_by_key(|g| g.id);
        Ok(grades)
    }

    async fn items_for_class(&self, class_id: i64) -> Result<Vec<GradableItem>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .items
            .values()
            .filter(|item| item.class_id == class_id)
            .cloned()
            .collect())
    }
}
