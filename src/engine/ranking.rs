// src/engine/ranking.rs

//! Scoped leaderboard reads. No locks are taken: a read racing a grade write
//! sees either the state before or after its commit.

use std::collections::HashMap;

use super::{
    ProgressionEngine,
    scope::{CallerContext, RankingFilter, Role, Scope, ScopeKey, resolve_scope},
    snapshot::standings,
    xp::LevelProgress,
};
use crate::{
    error::AppError,
    models::ranking::{RankingEntry, StudentProgress, Trend},
};

impl ProgressionEngine {
    /// Leaderboard visible to `caller`. Unresolvable scopes yield an empty list.
    pub async fn compute_ranking(
        &self,
        caller: &CallerContext,
        filter: &RankingFilter,
    ) -> Result<Vec<RankingEntry>, AppError> {
        let Some(scope) = resolve_scope(caller, filter) else {
            tracing::debug!(?caller, "No ranking scope for caller");
            return Ok(Vec::new());
        };
        let Some(key) = self.scope_key(caller, scope).await? else {
            return Ok(Vec::new());
        };

        self.ranking_for_key(key).await
    }

    /// Maps a scope to the key its students and snapshot are stored under.
    async fn scope_key(
        &self,
        caller: &CallerContext,
        scope: Scope,
    ) -> Result<Option<ScopeKey>, AppError> {
        Ok(match scope {
            Scope::Global => Some(ScopeKey::Global),
            Scope::ByTeacher(teacher_id) => Some(ScopeKey::Teacher(teacher_id)),
            Scope::ByClass(class_id) => match caller.role {
                Role::Teacher => self
                    .store
                    .find_class(class_id)
                    .await?
                    .filter(|class| Some(class.teacher_id) == caller.teacher_id)
                    .map(|class| ScopeKey::Class(class.id)),
                _ => Some(ScopeKey::Class(class_id)),
            },
            Scope::SelfOnly(student_id) => self
                .store
                .find_student(student_id)
                .await?
                .map(|student| ScopeKey::Class(student.class_id)),
        })
    }

    /// Ranks every student of `key` against the snapshot stored under the same key.
    pub async fn ranking_for_key(&self, key: ScopeKey) -> Result<Vec<RankingEntry>, AppError> {
        let students = self.store.students_in_scope(key).await?;
        if students.is_empty() {
            return Ok(Vec::new());
        }
        let grades = self.store.grades_for_scope(key).await?;
        let classes = self.store.classes_in_scope(key).await?;
        let previous = self.store.snapshot_positions(key).await?;

        let class_names: HashMap<i64, String> =
            classes.into_iter().map(|c| (c.id, c.name)).collect();
        let scope_name = match key {
            ScopeKey::Global => "Global".to_string(),
            ScopeKey::Teacher(_) => "All classes".to_string(),
            ScopeKey::Class(class_id) => class_names
                .get(&class_id)
                .cloned()
                .unwrap_or_else(|| key.to_string()),
        };

        let ranked = standings(&students, &grades, &self.settings.weights);
        let mut by_id: HashMap<i64, _> = students.into_iter().map(|s| (s.id, s)).collect();

        let entries = ranked
            .into_iter()
            .filter_map(|standing| {
                let student = by_id.remove(&standing.student_id)?;
                let previous_position = previous.get(&student.id).copied();
                let rank_delta = previous_position.map(|p| p - standing.position);

                Some(RankingEntry {
                    student_id: student.id,
                    name: student.name,
                    avatar_url: student.avatar_url,
                    class_id: student.class_id,
                    class_name: class_names.get(&student.class_id).cloned(),
                    scope_name: scope_name.clone(),
                    xp: standing.xp,
                    level: standing.level,
                    progress: LevelProgress::for_xp(standing.xp),
                    position: standing.position,
                    previous_position,
                    rank_delta,
                    trend: Trend::from_delta(rank_delta),
                })
            })
            .collect();

        Ok(entries)
    }

    /// The calling student's own card, ranked within their class.
    pub async fn student_progress(
        &self,
        caller: &CallerContext,
    ) -> Result<StudentProgress, AppError> {
        let student_id = match (caller.role, caller.student_id) {
            (Role::Student, Some(id)) => id,
            _ => {
                return Err(AppError::Forbidden(
                    "Only students have a progress card".to_string(),
                ));
            }
        };
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", student_id)))?;

        let entry = self
            .ranking_for_key(ScopeKey::Class(student.class_id))
            .await?
            .into_iter()
            .find(|e| e.student_id == student.id)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not ranked", student.id)))?;

        Ok(StudentProgress {
            student_id: entry.student_id,
            class_id: entry.class_id,
            xp: entry.xp,
            level: entry.level,
            progress: entry.progress,
            position: entry.position,
            previous_position: entry.previous_position,
            rank_delta: entry.rank_delta,
        })
    }
}
