// src/handlers/products.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::stock::SupplyLineInput,
};

// ---
// Validação customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 255, message = "O título é obrigatório."))]
    pub title: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub purchase_price: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Decimal,

    pub storage_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, max = 255, message = "O título não pode ser vazio."))]
    pub title: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub purchase_price: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Option<Decimal>,

    pub storage_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplyPayload {
    pub supplier_id: Uuid,
    // Duplicatas são mescladas somando as quantidades.
    pub products: Vec<SupplyLineInput>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    pub product_id: Uuid,
    pub quantity: i64,

    // Sem preço explícito, a venda usa o preço de tabela do produto.
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSalePayload {
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_price: Decimal,
}

// ---
// Produtos
// ---

pub async fn list_products(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.catalog_service.list_products(&user).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.catalog_service.get_product(&user, id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = app_state
        .catalog_service
        .create_product(
            &user,
            payload.storage_id,
            &payload.title,
            payload.purchase_price,
            payload.sale_price,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = app_state
        .catalog_service
        .update_product(
            &user,
            id,
            payload.title.as_deref(),
            payload.purchase_price,
            payload.sale_price,
            payload.storage_id,
        )
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_service.delete_product(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Fornecimentos
// ---

pub async fn list_supplies(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let supplies = app_state.stock_service.list_supplies(&user).await?;
    Ok(Json(supplies))
}

pub async fn get_supply(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let supply = app_state.stock_service.get_supply(&user, id).await?;
    Ok(Json(supply))
}

pub async fn create_supply(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateSupplyPayload>,
) -> Result<impl IntoResponse, AppError> {
    let supply = app_state
        .stock_service
        .create_supply(&user, payload.supplier_id, &payload.products)
        .await?;
    Ok((StatusCode::CREATED, Json(supply)))
}

// ---
// Vendas
// ---

pub async fn list_sales(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let sales = app_state.stock_service.list_sales(&user).await?;
    Ok(Json(sales))
}

pub async fn get_sale(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let sale = app_state.stock_service.get_sale(&user, id).await?;
    Ok(Json(sale))
}

pub async fn create_sale(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let sale = app_state
        .stock_service
        .create_sale(&user, payload.product_id, payload.quantity, payload.unit_price)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn update_sale(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSalePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let sale = app_state
        .stock_service
        .update_sale(&user, id, payload.unit_price)
        .await?;
    Ok(Json(sale))
}
