// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{catalog, grades, ranking},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Every `/api` route requires a bearer token.
/// * Grade routes additionally require a staff role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let staff_routes = Router::new()
        .route("/grades", get(grades::list_grades).post(grades::submit_grade))
        .layer(middleware::from_fn(staff_middleware));

    let api_routes = Router::new()
        .route("/ranking", get(ranking::get_ranking))
        .route("/progress/me", get(ranking::get_my_progress))
        .route("/items", get(catalog::list_items))
        .merge(staff_routes)
        // Auth runs before the staff check
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
