// src/handlers/grades.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
};

use crate::{
    engine::{ProgressionEngine, scope::CallerContext},
    error::AppError,
    models::{
        grade::{Grade, GradeCommand, GradeRequest},
        ranking::{ClassParams, parse_optional_id},
    },
};

/// Posts a grade for one student on one item.
///
/// * Snapshots the current ranking of the item's scope(s).
/// * Upserts the grade in the same atomic commit.
/// * Queues a notification to the student (never affects the response).
pub async fn submit_grade(
    State(engine): State<Arc<ProgressionEngine>>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<GradeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let command = GradeCommand::try_from(req)?;

    let outcome = engine.apply_grade(&caller, command).await?;

    Ok(Json(serde_json::json!({
        "accepted": true,
        "grade": outcome.grade,
        "xp_awarded": outcome.xp_awarded,
        "snapshot_scopes": outcome.snapshot_scopes,
    })))
}

/// Lists the grade rows of one class.
pub async fn list_grades(
    State(engine): State<Arc<ProgressionEngine>>,
    Extension(caller): Extension<CallerContext>,
    Query(params): Query<ClassParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(class_id) = parse_optional_id(params.class_id.as_deref(), "class_id")? else {
        return Ok(Json(Vec::<Grade>::new()));
    };

    let grades = engine.class_grades(&caller, class_id).await?;
    Ok(Json(grades))
}
