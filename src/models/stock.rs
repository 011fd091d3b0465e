// src/models/stock.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---
// 1. Supply (fornecimento, uma entrada multi-linha)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supply {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. Sale (venda, sempre um único produto)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---
// 3. Visões de leitura
// ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupplyItemView {
    pub product_id: Uuid,
    pub product_title: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyView {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_title: String,
    pub items: Vec<SupplyItemView>,
    pub created_by: Option<Uuid>,
    pub created_by_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_title: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---
// 4. Tipos do motor de estoque
// ---

// Item do payload de fornecimento (antes da mesclagem).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyLineInput {
    pub id: Uuid, // product id
    pub quantity: i64,
}

// Estado de um produto carregado sob trava de linha (FOR UPDATE).
// Carrega a filiação resolvida para a checagem de escopo e o preço
// de venda para o default de unit_price nas vendas.
#[derive(Debug, Clone, FromRow)]
pub struct LockedProduct {
    pub id: Uuid,
    pub title: String,
    pub quantity: i64,
    pub sale_price: Decimal,
    pub storage_id: Uuid,
    pub company_id: Uuid,
}
