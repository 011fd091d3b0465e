// src/handlers/companies.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::company::JoinRequestStatus,
    services::company_service::ReviewAction,
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 10, max = 12, message = "O INN deve ter entre 10 e 12 caracteres."))]
    pub inn: String,

    #[validate(length(min = 1, max = 255, message = "O título é obrigatório."))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyPayload {
    #[validate(length(min = 10, max = 12, message = "O INN deve ter entre 10 e 12 caracteres."))]
    pub inn: Option<String>,

    #[validate(length(min = 1, max = 255, message = "O título não pode ser vazio."))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequestFilter {
    pub status: Option<JoinRequestStatus>,
}

// ---
// Handlers
// ---

pub async fn list_companies(
    State(app_state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let companies = app_state.company_service.list_companies().await?;
    Ok(Json(companies))
}

pub async fn get_company(
    State(app_state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state.company_service.get_company(id).await?;
    Ok(Json(company))
}

pub async fn create_company(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let company = app_state
        .company_service
        .create_company(&user, &payload.inn, &payload.title)
        .await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn update_company(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let company = app_state
        .company_service
        .update_company(&user, id, payload.inn.as_deref(), payload.title.as_deref())
        .await?;
    Ok(Json(company))
}

pub async fn delete_company(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.company_service.delete_company(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Solicitações de vínculo
// ---

pub async fn request_join(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let request = app_state
        .company_service
        .request_join(&user, company_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_join_requests(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<JoinRequestFilter>,
) -> Result<impl IntoResponse, AppError> {
    let requests = app_state
        .company_service
        .list_join_requests(&user, filter.status)
        .await?;
    Ok(Json(requests))
}

pub async fn approve_join_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let request = app_state
        .company_service
        .review_join(&user, id, ReviewAction::Approve)
        .await?;
    Ok(Json(request))
}

pub async fn reject_join_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let request = app_state
        .company_service
        .review_join(&user, id, ReviewAction::Reject)
        .await?;
    Ok(Json(request))
}
