use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod health;
pub mod middleware_auth;
pub mod tasks;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let task_router = Router::new()
        .route(
            "/tasks/",
            get(tasks::routes::list).post(tasks::routes::create),
        )
        .route(
            "/tasks/{id}/",
            get(tasks::routes::get)
                .put(tasks::routes::replace)
                .patch(tasks::routes::patch)
                .delete(tasks::routes::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/token/", post(auth::obtain_token))
        .route("/token/refresh/", post(auth::refresh_token))
        .route("/register/", post(auth::register))
        .merge(task_router)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
