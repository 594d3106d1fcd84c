// src/engine/snapshot.rs

//! Rank snapshots and the atomic grade write.
//!
//! A grade write captures the current ranking of every scope the graded item
//! belongs to and upserts the grade in a single store commit. Writes to the
//! same scope are serialised by an in-process mutex per scope key. Writers in
//! other processes are caught by the scope version check inside the commit and
//! retried.

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    ProgressionEngine,
    notify::GradeEvent,
    scope::{CallerContext, Role, ScopeKey},
    xp::{StudentXp, XpWeights},
};
use crate::{
    error::AppError,
    models::{
        class_room::ClassRoom,
        grade::{Grade, GradeCommand, ScoredGrade},
        student::Student,
    },
    store::{GradeCommit, ScopeSnapshot},
};

/// Which scopes, besides the item's class, a grade write snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    /// Also snapshot the owning teacher's whole roster.
    pub teacher_scope: bool,
    /// Also snapshot every student. Serialises all grade writes.
    pub global_scope: bool,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            teacher_scope: true,
            global_scope: false,
        }
    }
}

impl SnapshotPolicy {
    /// Scope keys touched by grading an item of `class`, in lock order.
    pub fn scopes_for(&self, class: &ClassRoom) -> Vec<ScopeKey> {
        let mut scopes = Vec::with_capacity(3);
        if self.global_scope {
            scopes.push(ScopeKey::Global);
        }
        if self.teacher_scope {
            scopes.push(ScopeKey::Teacher(class.teacher_id));
        }
        scopes.push(ScopeKey::Class(class.id));
        scopes
    }
}

/// One student's place in a ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    pub student_id: i64,
    pub xp: f64,
    pub level: i64,
    pub position: i64,
}

/// Orders students by XP descending, then id ascending, and numbers them from 1.
///
/// Grades of students not in `students` are ignored; students without grades have 0 XP.
pub fn standings(students: &[Student], grades: &[ScoredGrade], weights: &XpWeights) -> Vec<Standing> {
    let mut grades_by_student: HashMap<i64, Vec<ScoredGrade>> =
        students.iter().map(|s| (s.id, Vec::new())).collect();
    for grade in grades {
        if let Some(own) = grades_by_student.get_mut(&grade.student_id) {
            own.push(*grade);
        }
    }

    let mut ranked: Vec<(i64, StudentXp)> = grades_by_student
        .into_iter()
        .map(|(student_id, own)| (student_id, StudentXp::from_grades(&own, weights)))
        .collect();
    ranked.sort_by(|a, b| match b.1.xp.total_cmp(&a.1.xp) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (student_id, stats))| Standing {
            student_id,
            xp: stats.xp,
            level: stats.level,
            position: index as i64 + 1,
        })
        .collect()
}

/// Per-scope async mutexes. Entries live as long as the engine.
#[derive(Default)]
pub struct ScopeLocks {
    inner: Mutex<HashMap<ScopeKey, Arc<Mutex<()>>>>,
}

impl ScopeLocks {
    /// Locks every key in ascending `ScopeKey` order. Guards release on drop.
    pub async fn acquire(&self, keys: &[ScopeKey]) -> Vec<OwnedMutexGuard<()>> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let handles: Vec<Arc<Mutex<()>>> = {
            let mut map = self.inner.lock().await;
            keys.iter()
                .map(|key| map.entry(*key).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

/// Result of a successful grade write.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub grade: Grade,
    pub xp_awarded: f64,
    /// Scope keys whose snapshot was replaced.
    pub snapshot_scopes: Vec<String>,
}

impl ProgressionEngine {
    /// Snapshots the affected scopes and upserts one grade, atomically per scope.
    ///
    /// Validation, not-found and permission errors are returned before any write.
    /// A notification is emitted after the commit; its failure never reaches the caller.
    #[tracing::instrument(
        skip(self, caller),
        fields(student_id = command.student_id, item_id = command.item_id)
    )]
    pub async fn apply_grade(
        &self,
        caller: &CallerContext,
        command: GradeCommand,
    ) -> Result<GradeOutcome, AppError> {
        command.check()?;

        let student = self
            .store
            .find_student(command.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", command.student_id)))?;
        let item = self
            .store
            .find_item(command.item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", command.item_id)))?;
        let class = self
            .store
            .find_class(item.class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", item.class_id)))?;

        authorize_grading(caller, &class)?;

        if student.class_id != item.class_id {
            return Err(AppError::BadRequest(format!(
                "Student {} is not in class {}",
                student.id, item.class_id
            )));
        }

        let scopes = self.settings.policy.scopes_for(&class);
        let guards = self.locks.acquire(&scopes).await;

        let mut attempt = 0;
        let grade = loop {
            let snapshots = self.capture(&scopes).await?;
            let commit = GradeCommit {
                snapshots,
                student_id: student.id,
                item_id: item.id,
                score: command.score,
            };

            match self.store.commit_grade(commit).await {
                Ok(grade) => break grade,
                Err(AppError::ConcurrencyConflict(reason))
                    if attempt < self.settings.max_conflict_retries =>
                {
                    attempt += 1;
                    tracing::warn!(attempt, "Snapshot conflict, retrying: {}", reason);
                }
                Err(e) => return Err(e),
            }
        };
        drop(guards);

        let xp_awarded = self.settings.weights.xp_for(grade.score, item.kind);
        tracing::info!(
            grade_id = grade.id,
            score = grade.score,
            xp_awarded,
            "Grade committed"
        );

        self.notifier.emit(GradeEvent {
            from_id: caller.teacher_id,
            student_id: student.id,
            item_title: item.title,
            score: grade.score,
            xp_awarded,
        });

        Ok(GradeOutcome {
            grade,
            xp_awarded,
            snapshot_scopes: scopes.iter().map(ToString::to_string).collect(),
        })
    }

    /// Reads each scope's version, then its current positions.
    async fn capture(&self, scopes: &[ScopeKey]) -> Result<Vec<ScopeSnapshot>, AppError> {
        let mut snapshots = Vec::with_capacity(scopes.len());
        for &scope in scopes {
            // Version first: anything committed after this read fails the commit check.
            let expected_version = self.store.scope_version(scope).await?;
            let students = self.store.students_in_scope(scope).await?;
            let grades = self.store.grades_for_scope(scope).await?;

            let positions = standings(&students, &grades, &self.settings.weights)
                .into_iter()
                .map(|s| (s.student_id, s.position))
                .collect();

            snapshots.push(ScopeSnapshot {
                scope,
                expected_version,
                positions,
            });
        }
        Ok(snapshots)
    }
}

fn authorize_grading(caller: &CallerContext, class: &ClassRoom) -> Result<(), AppError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Teacher if caller.teacher_id == Some(class.teacher_id) => Ok(()),
        Role::Teacher => Err(AppError::Forbidden(format!(
            "Class {} belongs to another teacher",
            class.id
        ))),
        Role::Student => Err(AppError::Forbidden("Students cannot post grades".to_string())),
    }
}
