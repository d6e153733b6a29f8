// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, catalog, exams, preferences, results, taker, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Taking exams, viewing results and preferences are public.
/// * Authoring, the catalog and logout need a signed-in user.
/// * User administration also needs the admin role.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/session", get(auth::session))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(require_auth.clone()),
        );

    let authoring_routes = Router::new()
        .route("/exams", post(exams::create_exam))
        .route("/exam-groups", post(exams::create_exam_group))
        .route("/catalog", get(catalog::list_cards).delete(catalog::clear_all))
        .route("/catalog/{id}", delete(catalog::delete_card))
        .layer(require_auth.clone());

    let public_routes = Router::new()
        .route("/take", get(taker::open_exam))
        .route("/take/submit", post(taker::submit_answers))
        .route("/results", get(results::list_results))
        .route("/results/exams/{exam_id}/print", get(results::print_exam))
        .route("/results/groups/{group_id}/print", get(results::print_group))
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_preferences),
        );

    let admin_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/stats", get(users::user_stats))
        .route("/users/{id}", delete(users::delete_user))
        // Auth first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(authoring_routes)
        .merge(public_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
