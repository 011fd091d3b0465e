// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---
// 1. Storage (armazém da empresa)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    pub id: Uuid,
    pub address: String,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Supplier (fornecedor)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub title: String,
    pub inn: String,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 3. Product (produto em um armazém)
// ---
// A filiação à empresa é transitiva via storage.company_id.
// `quantity` só é alterado pelo motor de estoque (fornecimento/venda),
// nunca pelos endpoints genéricos de produto.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub quantity: i64,
    pub storage_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Visão de leitura do produto com o endereço do armazém.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: Uuid,
    pub title: String,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub quantity: i64,
    pub storage_id: Uuid,
    pub storage_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
