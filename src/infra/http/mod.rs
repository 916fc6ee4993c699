//! JSON HTTP surface for goods.

pub mod error;
mod handlers;
mod middleware;
pub mod models;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::application::goods::GoodsService;
use crate::infra::db::PostgresRepositories;

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct GoodsState {
    pub goods: Arc<GoodsService>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_router(state: GoodsState) -> Router {
    Router::new()
        .route(
            "/good",
            get(handlers::get_good)
                .post(handlers::create_good)
                .patch(handlers::update_good)
                .delete(handlers::remove_good),
        )
        .route("/goods", get(handlers::list_goods))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
