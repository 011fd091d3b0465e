// src/handlers/auth.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AddEmployeePayload, LoginUserPayload, RefreshPayload, RegisterUserPayload},
};

pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = app_state
        .auth_service
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(response))
}

pub async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(Json(response))
}

// O usuário autenticado, recarregado do banco pelo guard.
pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(user)
}

pub async fn list_employees(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let employees = app_state.company_service.list_employees(&user).await?;
    Ok(Json(employees))
}

pub async fn add_employee(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<AddEmployeePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let employee = app_state
        .company_service
        .add_employee(&user, &payload.email)
        .await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn remove_employee(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(employee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .company_service
        .remove_employee(&user, employee_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
