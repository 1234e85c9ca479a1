// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, collections, exercises, lessons, notes, templates},
    state::AppState,
    utils::jwt::{auth_middleware, write_scope_middleware},
};

/// Assembles the main application router.
///
/// * Login is public.
/// * Reads need a valid token for this store's namespace.
/// * Writes additionally need the 'readWrite' role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let read_routes = Router::new()
        .route("/collections", get(collections::list_collections))
        .route("/collections/{name}/documents", get(collections::list_documents))
        .route("/collections/{name}/documents/{id}", get(collections::get_document))
        .route("/collections/{name}/search", get(collections::search_documents))
        .route("/lessons/{lesson_id}", get(lessons::get_lesson))
        .route("/lessons/{lesson_id}/exercises", get(exercises::list_lesson_exercises))
        .route("/exercises/{id}/public", get(exercises::get_public_exercise))
        .route("/notes", get(notes::list_notes))
        .route("/templates/{id}/render", post(templates::render_template));

    let write_routes = Router::new()
        .route("/collections/{name}/documents", post(collections::create_documents))
        .route(
            "/collections/{name}/documents/{id}",
            put(collections::replace_document).delete(collections::delete_document),
        )
        .route("/lessons/{lesson_id}/content", put(lessons::update_content))
        .layer(middleware::from_fn(write_scope_middleware));

    // Auth first, then the write-scope check
    let protected_routes = read_routes
        .merge(write_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
