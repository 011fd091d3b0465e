// src/db/catalog_repo.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Product, ProductView, Storage, Supplier},
};

// CRUD escopado do catálogo: armazéns, fornecedores e produtos.
// Toda consulta filtra pela empresa resolvida do chamador; um recurso de
// outra empresa é indistinguível de um recurso inexistente.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

const PRODUCT_VIEW_QUERY: &str = r#"
    SELECT p.id, p.title, p.purchase_price, p.sale_price, p.quantity,
           p.storage_id, s.address AS storage_address, p.created_at, p.updated_at
    FROM products p
    JOIN storages s ON s.id = p.storage_id
"#;

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Armazéns
    // ---

    pub async fn list_storages(&self, company_id: Uuid) -> Result<Vec<Storage>, AppError> {
        let storages = sqlx::query_as::<_, Storage>(
            r#"
            SELECT id, address, company_id, created_at, updated_at
            FROM storages
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(storages)
    }

    pub async fn find_storage(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Storage>, AppError> {
        let storage = sqlx::query_as::<_, Storage>(
            r#"
            SELECT id, address, company_id, created_at, updated_at
            FROM storages
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(storage)
    }

    pub async fn create_storage(
        &self,
        company_id: Uuid,
        address: &str,
    ) -> Result<Storage, AppError> {
        let storage = sqlx::query_as::<_, Storage>(
            r#"
            INSERT INTO storages (address, company_id)
            VALUES ($1, $2)
            RETURNING id, address, company_id, created_at, updated_at
            "#,
        )
        .bind(address)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(storage)
    }

    pub async fn update_storage(
        &self,
        company_id: Uuid,
        id: Uuid,
        address: &str,
    ) -> Result<Option<Storage>, AppError> {
        let storage = sqlx::query_as::<_, Storage>(
            r#"
            UPDATE storages
            SET address = $3, updated_at = now()
            WHERE id = $1 AND company_id = $2
            RETURNING id, address, company_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(storage)
    }

    pub async fn delete_storage(&self, company_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM storages WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Empresa dona de um armazém (para a checagem de escopo na criação
    /// e atualização de produtos).
    pub async fn storage_company(&self, storage_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let company = sqlx::query_scalar::<_, Uuid>(
            "SELECT company_id FROM storages WHERE id = $1",
        )
        .bind(storage_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    // ---
    // Fornecedores
    // ---

    pub async fn list_suppliers(&self, company_id: Uuid) -> Result<Vec<Supplier>, AppError> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, title, inn, company_id, created_at, updated_at
            FROM suppliers
            WHERE company_id = $1
            ORDER BY title ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    pub async fn find_supplier(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Supplier>, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, title, inn, company_id, created_at, updated_at
            FROM suppliers
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(supplier)
    }

    pub async fn create_supplier(
        &self,
        company_id: Uuid,
        title: &str,
        inn: &str,
    ) -> Result<Supplier, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (title, inn, company_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, inn, company_id, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(inn)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        company_id: Uuid,
        id: Uuid,
        title: Option<&str>,
        inn: Option<&str>,
    ) -> Result<Option<Supplier>, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers
            SET title = COALESCE($3, title),
                inn = COALESCE($4, inn),
                updated_at = now()
            WHERE id = $1 AND company_id = $2
            RETURNING id, title, inn, company_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(title)
        .bind(inn)
        .fetch_optional(&self.pool)
        .await?;
        Ok(supplier)
    }

    pub async fn delete_supplier(&self, company_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Produtos
    // ---

    pub async fn list_products(&self, company_id: Uuid) -> Result<Vec<ProductView>, AppError> {
        let products = sqlx::query_as::<_, ProductView>(&format!(
            "{PRODUCT_VIEW_QUERY} WHERE s.company_id = $1 ORDER BY p.title ASC"
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn find_product(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ProductView>, AppError> {
        let product = sqlx::query_as::<_, ProductView>(&format!(
            "{PRODUCT_VIEW_QUERY} WHERE p.id = $1 AND s.company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Cria um produto. O saldo inicial é sempre 0, independentemente do
    /// payload: reposição só via fornecimento.
    pub async fn create_product(
        &self,
        storage_id: Uuid,
        title: &str,
        purchase_price: Decimal,
        sale_price: Decimal,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (title, purchase_price, sale_price, quantity, storage_id)
            VALUES ($1, $2, $3, 0, $4)
            RETURNING id, title, purchase_price, sale_price, quantity,
                      storage_id, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(purchase_price)
        .bind(sale_price)
        .bind(storage_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    /// Atualização genérica de produto: título, preços e armazém.
    /// `quantity` não é atualizável por aqui (regra de negócio do motor
    /// de estoque, não uma constraint do banco).
    pub async fn update_product(
        &self,
        company_id: Uuid,
        id: Uuid,
        title: Option<&str>,
        purchase_price: Option<Decimal>,
        sale_price: Option<Decimal>,
        storage_id: Option<Uuid>,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products p
            SET title = COALESCE($3, p.title),
                purchase_price = COALESCE($4, p.purchase_price),
                sale_price = COALESCE($5, p.sale_price),
                storage_id = COALESCE($6, p.storage_id),
                updated_at = now()
            FROM storages s
            WHERE p.id = $1 AND s.id = p.storage_id AND s.company_id = $2
            RETURNING p.id, p.title, p.purchase_price, p.sale_price, p.quantity,
                      p.storage_id, p.created_at, p.updated_at
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(title)
        .bind(purchase_price)
        .bind(sale_price)
        .bind(storage_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn delete_product(&self, company_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM products p
            USING storages s
            WHERE p.id = $1 AND s.id = p.storage_id AND s.company_id = $2
            "#,
        )
        .bind(id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
