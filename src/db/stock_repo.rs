// src/db/stock_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::stock::{LockedProduct, Sale, SaleView, Supply, SupplyItemView, SupplyView},
    services::stock_service::{StockStore, StockTx},
};

// Persistência do motor de estoque. Toda mutação roda dentro de uma
// transação Postgres com trava pessimista de linha (FOR UPDATE) sobre
// os produtos envolvidos, em ordem ascendente de id para evitar deadlock
// entre operações concorrentes.
#[derive(Clone)]
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct PgStockTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTx for PgStockTx {
    async fn lock_products(&mut self, ids: &[Uuid]) -> Result<Vec<LockedProduct>, AppError> {
        let products = sqlx::query_as::<_, LockedProduct>(
            r#"
            SELECT p.id, p.title, p.quantity, p.sale_price, p.storage_id, s.company_id
            FROM products p
            JOIN storages s ON s.id = p.storage_id
            WHERE p.id = ANY($1)
            ORDER BY p.id
            FOR UPDATE OF p
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(products)
    }

    async fn adjust_quantity(&mut self, product_id: Uuid, delta: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE products SET quantity = quantity + $2, updated_at = now() WHERE id = $1",
        )
        .bind(product_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_supply(
        &mut self,
        supplier_id: Uuid,
        created_by: Uuid,
    ) -> Result<Supply, AppError> {
        let supply = sqlx::query_as::<_, Supply>(
            r#"
            INSERT INTO supplies (supplier_id, created_by)
            VALUES ($1, $2)
            RETURNING id, supplier_id, created_by, created_at
            "#,
        )
        .bind(supplier_id)
        .bind(created_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(supply)
    }

    async fn insert_supply_line(
        &mut self,
        supply_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO supply_lines (supply_id, product_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(supply_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_sale(
        &mut self,
        product_id: Uuid,
        quantity: i64,
        unit_price: Decimal,
        created_by: Uuid,
    ) -> Result<Sale, AppError> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (product_id, quantity, unit_price, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, quantity, unit_price, created_by, created_at
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(created_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(sale)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// Cabeçalho do fornecimento com os joins de leitura (fornecedor e autor).
#[derive(FromRow)]
struct SupplyHeaderRow {
    id: Uuid,
    supplier_id: Uuid,
    supplier_title: String,
    created_by: Option<Uuid>,
    created_by_username: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SupplyLineRow {
    supply_id: Uuid,
    product_id: Uuid,
    product_title: String,
    quantity: i64,
}

const SUPPLY_HEADER_QUERY: &str = r#"
    SELECT sp.id, sp.supplier_id, f.title AS supplier_title,
           sp.created_by, u.username AS created_by_username, sp.created_at
    FROM supplies sp
    JOIN suppliers f ON f.id = sp.supplier_id
    LEFT JOIN users u ON u.id = sp.created_by
"#;

const SALE_VIEW_QUERY: &str = r#"
    SELECT v.id, v.product_id, p.title AS product_title,
           v.quantity, v.unit_price, v.created_by, v.created_at
    FROM sales v
    JOIN products p ON p.id = v.product_id
    JOIN storages s ON s.id = p.storage_id
"#;

impl StockRepository {
    /// Carrega as linhas dos fornecimentos e monta as visões completas,
    /// preservando a ordem dos cabeçalhos.
    async fn assemble_supplies(
        &self,
        headers: Vec<SupplyHeaderRow>,
    ) -> Result<Vec<SupplyView>, AppError> {
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let lines = sqlx::query_as::<_, SupplyLineRow>(
            r#"
            SELECT sl.supply_id, sl.product_id, p.title AS product_title, sl.quantity
            FROM supply_lines sl
            JOIN products p ON p.id = sl.product_id
            WHERE sl.supply_id = ANY($1)
            ORDER BY sl.product_id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_supply: HashMap<Uuid, Vec<SupplyItemView>> = HashMap::new();
        for line in lines {
            by_supply
                .entry(line.supply_id)
                .or_default()
                .push(SupplyItemView {
                    product_id: line.product_id,
                    product_title: line.product_title,
                    quantity: line.quantity,
                });
        }

        Ok(headers
            .into_iter()
            .map(|h| SupplyView {
                items: by_supply.remove(&h.id).unwrap_or_default(),
                id: h.id,
                supplier_id: h.supplier_id,
                supplier_title: h.supplier_title,
                created_by: h.created_by,
                created_by_username: h.created_by_username,
                created_at: h.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl StockStore for StockRepository {
    async fn begin(&self) -> Result<Box<dyn StockTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStockTx { tx }))
    }

    async fn supplier_company(&self, supplier_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let company = sqlx::query_scalar::<_, Uuid>(
            "SELECT company_id FROM suppliers WHERE id = $1",
        )
        .bind(supplier_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    async fn list_supplies(&self, company_id: Uuid) -> Result<Vec<SupplyView>, AppError> {
        let headers = sqlx::query_as::<_, SupplyHeaderRow>(&format!(
            "{SUPPLY_HEADER_QUERY} WHERE f.company_id = $1 ORDER BY sp.created_at DESC"
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        self.assemble_supplies(headers).await
    }

    async fn get_supply(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SupplyView>, AppError> {
        let header = sqlx::query_as::<_, SupplyHeaderRow>(&format!(
            "{SUPPLY_HEADER_QUERY} WHERE sp.id = $1 AND f.company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(header) = header else {
            return Ok(None);
        };
        Ok(self.assemble_supplies(vec![header]).await?.into_iter().next())
    }

    async fn list_sales(&self, company_id: Uuid) -> Result<Vec<SaleView>, AppError> {
        let sales = sqlx::query_as::<_, SaleView>(&format!(
            "{SALE_VIEW_QUERY} WHERE s.company_id = $1 ORDER BY v.created_at DESC"
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    async fn get_sale(&self, company_id: Uuid, id: Uuid) -> Result<Option<SaleView>, AppError> {
        let sale = sqlx::query_as::<_, SaleView>(&format!(
            "{SALE_VIEW_QUERY} WHERE v.id = $1 AND s.company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sale)
    }

    async fn update_sale_price(
        &self,
        company_id: Uuid,
        id: Uuid,
        unit_price: Decimal,
    ) -> Result<Option<SaleView>, AppError> {
        let sale = sqlx::query_as::<_, SaleView>(
            r#"
            UPDATE sales v
            SET unit_price = $3
            FROM products p
            JOIN storages s ON s.id = p.storage_id
            WHERE v.id = $1 AND p.id = v.product_id AND s.company_id = $2
            RETURNING v.id, v.product_id, p.title AS product_title,
                      v.quantity, v.unit_price, v.created_by, v.created_at
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(unit_price)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sale)
    }
}
