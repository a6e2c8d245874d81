//! Resource CRUD handlers, generic over the record type. Each request runs in one storage
//! transaction that is committed only when the operation succeeds.

use crate::error::AppError;
use crate::model::{EntityKind, Id, Resource};
use crate::response::{created, message, ok, ok_many};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Ids are integers; any other path segment names no resource.
fn parse_id(kind: EntityKind, id_str: &str) -> Result<Id, AppError> {
    id_str.parse().map_err(|_| AppError::InvalidId {
        kind,
        raw: id_str.to_string(),
    })
}

fn parse_body<T: DeserializeOwned>(payload: Result<Json<Value>, JsonRejection>) -> Result<T, AppError> {
    let Json(value) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if !value.is_object() {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    }
    serde_json::from_value(value).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub async fn list<R: Resource>(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut tx = state.storage.begin().await?;
    let rows = CrudService::list::<R>(tx.as_mut()).await?;
    tx.commit().await?;
    Ok(ok_many(rows))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input: R::Input = parse_body(payload)?;
    let mut tx = state.storage.begin().await?;
    let row = CrudService::create::<R>(tx.as_mut(), input).await?;
    tx.commit().await?;
    Ok(created(row))
}

pub async fn read<R: Resource>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(R::KIND, &id_str)?;
    let mut tx = state.storage.begin().await?;
    let row = CrudService::read::<R>(tx.as_mut(), id).await?;
    tx.commit().await?;
    Ok(ok(row))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(R::KIND, &id_str)?;
    let patch: R::Patch = parse_body(payload)?;
    let mut tx = state.storage.begin().await?;
    let row = CrudService::update::<R>(tx.as_mut(), id, patch).await?;
    tx.commit().await?;
    Ok(ok(row))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(R::KIND, &id_str)?;
    let mut tx = state.storage.begin().await?;
    let plan = CrudService::delete::<R>(tx.as_mut(), id).await?;
    tx.commit().await?;
    Ok(message(format!(
        "{} {} deleted ({} rows removed)",
        R::KIND,
        id,
        plan.len()
    )))
}
