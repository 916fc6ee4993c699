use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;

use super::GoodsState;
use super::error::ApiError;
use super::models::{GoodKeyQuery, GoodPayload, ListQuery, ProjectQuery};

pub async fn create_good(
    State(state): State<GoodsState>,
    query: ProjectQuery,
    payload: GoodPayload,
) -> Result<impl IntoResponse, ApiError> {
    let good = state.goods.create(query.project_id, payload.into()).await?;
    Ok(Json(good))
}

pub async fn update_good(
    State(state): State<GoodsState>,
    query: GoodKeyQuery,
    payload: GoodPayload,
) -> Result<impl IntoResponse, ApiError> {
    let good = state.goods.update(query.into(), payload.into()).await?;
    Ok(Json(good))
}

pub async fn remove_good(
    State(state): State<GoodsState>,
    query: GoodKeyQuery,
) -> Result<impl IntoResponse, ApiError> {
    let good = state.goods.remove(query.into()).await?;
    Ok(Json(good))
}

pub async fn get_good(
    State(state): State<GoodsState>,
    query: GoodKeyQuery,
) -> Result<impl IntoResponse, ApiError> {
    let good = state.goods.get(query.into()).await?;
    Ok(Json(good))
}

pub async fn list_goods(
    State(state): State<GoodsState>,
    query: ListQuery,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.goods.list(query.into()).await?;
    Ok(Json(page))
}

pub async fn health(State(state): State<GoodsState>) -> Response {
    if let Err(err) = state.db.health_check().await {
        return unavailable("infra::http::health::db", &err);
    }
    if let Err(err) = state.goods.ping_cache().await {
        return unavailable("infra::http::health::cache", &err);
    }
    StatusCode::NO_CONTENT.into_response()
}

fn unavailable(source: &'static str, err: &dyn std::error::Error) -> Response {
    let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
    ErrorReport::from_error(source, StatusCode::SERVICE_UNAVAILABLE, err).attach(&mut response);
    response
}
