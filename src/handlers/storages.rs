// src/handlers/storages.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoragePayload {
    #[validate(length(min = 1, max = 255, message = "O endereço é obrigatório."))]
    pub address: String,

    // Opcional no payload; quando presente, precisa bater com a empresa
    // do chamador.
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoragePayload {
    #[validate(length(min = 1, max = 255, message = "O endereço é obrigatório."))]
    pub address: String,
}

pub async fn list_storages(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let storages = app_state.catalog_service.list_storages(&user).await?;
    Ok(Json(storages))
}

pub async fn get_storage(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let storage = app_state.catalog_service.get_storage(&user, id).await?;
    Ok(Json(storage))
}

pub async fn create_storage(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateStoragePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let storage = app_state
        .catalog_service
        .create_storage(&user, &payload.address, payload.company_id)
        .await?;
    Ok((StatusCode::CREATED, Json(storage)))
}

pub async fn update_storage(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStoragePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let storage = app_state
        .catalog_service
        .update_storage(&user, id, &payload.address)
        .await?;
    Ok(Json(storage))
}

pub async fn delete_storage(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_service.delete_storage(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
