// src/handlers/suppliers.rs

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
pub struct CreateSupplierPayload {
    #[validate(length(min = 1, max = 255, message = "O título é obrigatório."))]
    pub title: String,

    #[validate(length(min = 10, max = 12, message = "O INN deve ter entre 10 e 12 caracteres."))]
    pub inn: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierPayload {
    #[validate(length(min = 1, max = 255, message = "O título não pode ser vazio."))]
    pub title: Option<String>,

    #[validate(length(min = 10, max = 12, message = "O INN deve ter entre 10 e 12 caracteres."))]
    pub inn: Option<String>,
}

pub async fn list_suppliers(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let suppliers = app_state.catalog_service.list_suppliers(&user).await?;
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let supplier = app_state.catalog_service.get_supplier(&user, id).await?;
    Ok(Json(supplier))
}

pub async fn create_supplier(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateSupplierPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let supplier = app_state
        .catalog_service
        .create_supplier(&user, &payload.title, &payload.inn)
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let supplier = app_state
        .catalog_service
        .update_supplier(&user, id, payload.title.as_deref(), payload.inn.as_deref())
        .await?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_service.delete_supplier(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
