// src/engine/mod.rs

//! Leaderboard & progression engine.
//!
//! * `xp` turns grades into XP and levels.
//! * `snapshot` captures positions and applies grade writes atomically per scope.
//! * `ranking` builds the role-scoped leaderboard.
//! * `notify` delivers grade notifications off the write path.

pub mod notify;
pub mod ranking;
pub mod scope;
pub mod snapshot;
pub mod xp;

use std::sync::Arc;

use crate::{
    error::AppError,
    models::{class_room::ClassRoom, grade::Grade, item::GradableItem},
    store::ProgressionStore,
};

use self::{
    notify::Notifier,
    scope::{CallerContext, Role},
    snapshot::{ScopeLocks, SnapshotPolicy},
    xp::XpWeights,
};

/// Tunables of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub weights: XpWeights,
    pub policy: SnapshotPolicy,
    pub max_conflict_retries: u32,
    pub notification_buffer: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            weights: XpWeights::default(),
            policy: SnapshotPolicy::default(),
            max_conflict_retries: 3,
            notification_buffer: 256,
        }
    }
}

pub struct ProgressionEngine {
    store: Arc<dyn ProgressionStore>,
    settings: EngineSettings,
    locks: ScopeLocks,
    notifier: Notifier,
}

impl ProgressionEngine {
    /// Builds the engine and spawns its notifier task. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn ProgressionStore>, settings: EngineSettings) -> Self {
        let notifier = Notifier::spawn(store.clone(), settings.notification_buffer);
        Self {
            store,
            settings,
            locks: ScopeLocks::default(),
            notifier,
        }
    }

    /// Grade rows of a class. Staff only; teachers must own the class.
    pub async fn class_grades(
        &self,
        caller: &CallerContext,
        class_id: i64,
    ) -> Result<Vec<Grade>, AppError> {
        let class = self.require_class(class_id).await?;
        match caller.role {
            Role::Admin => {}
            Role::Teacher if caller.teacher_id == Some(class.teacher_id) => {}
            _ => {
                return Err(AppError::Forbidden(
                    "Not allowed to read grades of this class".to_string(),
                ));
            }
        }
        self.store.grades_for_class(class.id).await
    }

    /// Activities and missions of a class. Students may read their own class.
    pub async fn class_items(
        &self,
        caller: &CallerContext,
        class_id: i64,
    ) -> Result<Vec<GradableItem>, AppError> {
        let class = self.require_class(class_id).await?;
        let allowed = match caller.role {
            Role::Admin => true,
            Role::Teacher => caller.teacher_id == Some(class.teacher_id),
            Role::Student => match caller.student_id {
                Some(student_id) => self
                    .store
                    .find_student(student_id)
                    .await?
                    .is_some_and(|s| s.class_id == class.id),
                None => false,
            },
        };
        if !allowed {
            return Err(AppError::Forbidden(
                "Not allowed to read items of this class".to_string(),
            ));
        }
        self.store.items_for_class(class.id).await
    }

    async fn require_class(&self, class_id: i64) -> Result<ClassRoom, AppError> {
        self.store
            .find_class(class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", class_id)))
    }
}
