// src/routes.rs

use axum::{
    Router, middleware,
    http::Method,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{question, result, test},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Nests the question-store, test and result sub-routers.
/// * Every endpoint sits behind `auth_middleware`; role middlewares gate the
///   teacher-only and student-only routes.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Read source for the question bank (teacher only).
    let question_routes = Router::new()
        .route("/", get(question::list_questions))
        .route("/{id}", get(question::get_question))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Reads are for any authenticated role (handlers strip answers for
    // students); mutations are teacher only.
    let test_routes = Router::new()
        .route("/", get(test::list_tests))
        .route("/{id}", get(test::get_test))
        .merge(
            Router::new()
                .route("/", post(test::create_test))
                .route(
                    "/{id}",
                    put(test::update_test).delete(test::delete_test),
                )
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let result_routes = Router::new()
        .route("/submit", post(result::submit))
        .route("/my", get(result::my_results))
        .route("/review/{result_id}", get(result::review))
        .layer(middleware::from_fn(student_middleware))
        .merge(
            Router::new()
                .route("/summary/{test_id}", get(result::summary))
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(|| async { "Exam system backend is running." }))
        .nest("/api/questions", question_routes)
        .nest("/api/tests", test_routes)
        .nest("/api/results", result_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
