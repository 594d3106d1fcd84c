// src/handlers/ranking.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    engine::{
        ProgressionEngine,
        scope::{CallerContext, RankingFilter},
    },
    error::AppError,
    models::ranking::{RankingParams, parse_optional_id},
};

/// Returns the leaderboard visible to the caller.
///
/// * Admin: everyone, or one teacher / one class when filtered.
/// * Teacher: own classes, or one of them.
/// * Student: own class.
///
/// `previous_position` comes from the snapshot of the view's own scope. Class and
/// teacher-roster snapshots are taken by default; the global view only gets one
/// with `SNAPSHOT_GLOBAL_SCOPE=true`, until then its rows have trend `new`.
pub async fn get_ranking(
    State(engine): State<Arc<ProgressionEngine>>,
    Extension(caller): Extension<CallerContext>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = RankingFilter {
        teacher_id: parse_optional_id(params.teacher_id.as_deref(), "teacher_id")?,
        class_id: parse_optional_id(params.class_id.as_deref(), "class_id")?,
    };

    let ranking = engine.compute_ranking(&caller, &filter).await?;
    Ok(Json(ranking))
}

/// Returns the calling student's XP, level and class position.
pub async fn get_my_progress(
    State(engine): State<Arc<ProgressionEngine>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl IntoResponse, AppError> {
    let progress = engine.student_progress(&caller).await?;
    Ok(Json(progress))
}
