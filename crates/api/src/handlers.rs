use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use catalogapi_catalog::Catalog;
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

pub async fn welcome() -> &'static str {
    "Catalog api service."
}

pub async fn list_catalogs(State(state): State<AppState>) -> ApiResult<Json<Vec<Catalog>>> {
    let catalogs = state.store.read_all().await?;
    Ok(Json(catalogs))
}

pub async fn get_catalog(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Catalog>> {
    let id = catalog_id(id)?;

    let catalog = state.store.find(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(catalog))
}

pub async fn create_catalog(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Catalog>> {
    let mut catalog = catalog_body(&body)?;

    catalog.id = state.store.create(&catalog).await?;
    tracing::info!(id = catalog.id, "Created catalog");

    Ok(Json(catalog))
}

pub async fn update_catalog(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Catalog>)> {
    let catalog = catalog_body(&body)?;

    // The existence check is the affected-row count of the update itself.
    if state.store.update(&catalog).await? == 0 {
        return Err(ApiError::NotFound);
    }
    tracing::info!(id = catalog.id, "Updated catalog");

    Ok((StatusCode::ACCEPTED, Json(catalog)))
}

pub async fn delete_catalog(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = catalog_id(id)?;

    let deleted = state.store.delete(id).await?;
    tracing::info!(id, deleted, "Deleted catalog");

    Ok(Json(Value::Null))
}

fn catalog_id(id: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    id.map(|Path(id)| id)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// Decoded regardless of Content-Type.
fn catalog_body(body: &[u8]) -> ApiResult<Catalog> {
    serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(err.to_string()))
}
