// src/handlers/catalog.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    engine::{ProgressionEngine, scope::CallerContext},
    error::AppError,
    models::{
        item::GradableItem,
        ranking::{ClassParams, parse_optional_id},
    },
};

/// Lists the activities and missions of a class.
/// Without a class the list is empty.
pub async fn list_items(
    State(engine): State<Arc<ProgressionEngine>>,
    Extension(caller): Extension<CallerContext>,
    Query(params): Query<ClassParams>,
) -> Result<impl IntoResponse, AppError> {
    let class_id = match parse_optional_id(params.class_id.as_deref(), "class_id")? {
        Some(id) => Some(id),
        None => caller.class_id,
    };
    let Some(class_id) = class_id else {
        return Ok(Json(Vec::<GradableItem>::new()));
    };

    let items = engine.class_items(&caller, class_id).await?;
    Ok(Json(items))
}
