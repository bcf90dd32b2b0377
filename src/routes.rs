// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{MethodRouter, delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exam, question, stats},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Requires a valid bearer token.
fn authed(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// Requires a valid bearer token AND a stored 'admin' role.
/// Double middleware protection: Auth first, then Admin check.
fn admin(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn_with_state(state.clone(), admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// Assembles the main application router.
///
/// * Public: signup/login, exam listing and retrieval.
/// * Authenticated: submission, results, personal dashboard.
/// * Admin: exam and question management, site dashboard.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route(
            "/",
            get(exam::list_exams).merge(admin(&state, post(exam::create_exam))),
        )
        .route(
            "/{id}",
            get(exam::get_exam).merge(admin(&state, delete(exam::delete_exam))),
        )
        .route("/{id}/submit", authed(&state, post(exam::submit_exam)))
        .route("/{id}/results", authed(&state, get(exam::get_results)));

    let question_routes = Router::new()
        .route(
            "/",
            admin(
                &state,
                get(question::list_questions).post(question::create_question),
            ),
        )
        .route(
            "/{id}",
            admin(
                &state,
                put(question::update_question).delete(question::delete_question),
            ),
        );

    let user_routes = Router::new()
        .route("/stats", authed(&state, get(stats::user_stats)))
        .route("/attempts", authed(&state, get(stats::user_attempts)));

    let admin_routes = Router::new().route("/stats", admin(&state, get(stats::admin_stats)));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/user", user_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
