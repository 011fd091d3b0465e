// src/services/catalog_service.rs

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::{
        auth::User,
        catalog::{Product, ProductView, Storage, Supplier},
    },
    services::access,
};

// Regras de catálogo: armazéns têm leitura de membro e escrita de dono;
// fornecedores e produtos são de membro. A empresa nunca vem do payload:
// é sempre a do chamador, e referências cruzadas em escrita viram 400.
#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository) -> Self {
        Self { catalog_repo }
    }

    // ---
    // Armazéns
    // ---

    /// Lista os armazéns da empresa do chamador. Sem filiação, a lista é
    /// vazia (não é um erro).
    pub async fn list_storages(&self, actor: &User) -> Result<Vec<Storage>, AppError> {
        let Some(company_id) = actor.company_id else {
            return Ok(Vec::new());
        };
        self.catalog_repo.list_storages(company_id).await
    }

    pub async fn get_storage(&self, actor: &User, id: Uuid) -> Result<Storage, AppError> {
        let Some(company_id) = actor.company_id else {
            return Err(AppError::NotFound("Armazém"));
        };
        self.catalog_repo
            .find_storage(company_id, id)
            .await?
            .ok_or(AppError::NotFound("Armazém"))
    }

    /// Cria um armazém na empresa do dono. Um company_id divergente no
    /// payload é rejeitado em vez de silenciosamente ignorado.
    pub async fn create_storage(
        &self,
        actor: &User,
        address: &str,
        payload_company_id: Option<Uuid>,
    ) -> Result<Storage, AppError> {
        let company_id = access::owner_company(actor)?;
        if let Some(requested) = payload_company_id {
            if requested != company_id {
                return Err(AppError::BusinessRule(
                    "O armazém só pode ser criado na sua própria empresa.".to_string(),
                ));
            }
        }
        self.catalog_repo.create_storage(company_id, address).await
    }

    pub async fn update_storage(
        &self,
        actor: &User,
        id: Uuid,
        address: &str,
    ) -> Result<Storage, AppError> {
        let company_id = access::owner_company(actor)?;
        self.catalog_repo
            .update_storage(company_id, id, address)
            .await?
            .ok_or(AppError::NotFound("Armazém"))
    }

    pub async fn delete_storage(&self, actor: &User, id: Uuid) -> Result<(), AppError> {
        let company_id = access::owner_company(actor)?;
        if !self.catalog_repo.delete_storage(company_id, id).await? {
            return Err(AppError::NotFound("Armazém"));
        }
        Ok(())
    }

    // ---
    // Fornecedores
    // ---

    pub async fn list_suppliers(&self, actor: &User) -> Result<Vec<Supplier>, AppError> {
        let company_id = access::member_company(actor)?;
        self.catalog_repo.list_suppliers(company_id).await
    }

    pub async fn get_supplier(&self, actor: &User, id: Uuid) -> Result<Supplier, AppError> {
        let company_id = access::member_company(actor)?;
        self.catalog_repo
            .find_supplier(company_id, id)
            .await?
            .ok_or(AppError::NotFound("Fornecedor"))
    }

    pub async fn create_supplier(
        &self,
        actor: &User,
        title: &str,
        inn: &str,
    ) -> Result<Supplier, AppError> {
        let company_id = access::member_company(actor)?;
        self.catalog_repo.create_supplier(company_id, title, inn).await
    }

    pub async fn update_supplier(
        &self,
        actor: &User,
        id: Uuid,
        title: Option<&str>,
        inn: Option<&str>,
    ) -> Result<Supplier, AppError> {
        let company_id = access::member_company(actor)?;
        self.catalog_repo
            .update_supplier(company_id, id, title, inn)
            .await?
            .ok_or(AppError::NotFound("Fornecedor"))
    }

    pub async fn delete_supplier(&self, actor: &User, id: Uuid) -> Result<(), AppError> {
        let company_id = access::member_company(actor)?;
        if !self.catalog_repo.delete_supplier(company_id, id).await? {
            return Err(AppError::NotFound("Fornecedor"));
        }
        Ok(())
    }

    // ---
    // Produtos
    // ---

    pub async fn list_products(&self, actor: &User) -> Result<Vec<ProductView>, AppError> {
        let company_id = access::member_company(actor)?;
        self.catalog_repo.list_products(company_id).await
    }

    pub async fn get_product(&self, actor: &User, id: Uuid) -> Result<ProductView, AppError> {
        let company_id = access::member_company(actor)?;
        self.catalog_repo
            .find_product(company_id, id)
            .await?
            .ok_or(AppError::NotFound("Produto"))
    }

    /// Garante que o armazém de destino pertence à empresa do chamador.
    /// Armazém inexistente e armazém de outra empresa são o mesmo erro.
    async fn check_storage_scope(
        &self,
        company_id: Uuid,
        storage_id: Uuid,
    ) -> Result<(), AppError> {
        match self.catalog_repo.storage_company(storage_id).await? {
            Some(owner) if owner == company_id => Ok(()),
            _ => Err(AppError::BusinessRule(
                "O armazém informado não pertence à sua empresa.".to_string(),
            )),
        }
    }

    pub async fn create_product(
        &self,
        actor: &User,
        storage_id: Uuid,
        title: &str,
        purchase_price: Decimal,
        sale_price: Decimal,
    ) -> Result<ProductView, AppError> {
        let company_id = access::member_company(actor)?;
        self.check_storage_scope(company_id, storage_id).await?;
        let product = self
            .catalog_repo
            .create_product(storage_id, title, purchase_price, sale_price)
            .await?;
        self.catalog_repo
            .find_product(company_id, product.id)
            .await?
            .ok_or(AppError::NotFound("Produto"))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_product(
        &self,
        actor: &User,
        id: Uuid,
        title: Option<&str>,
        purchase_price: Option<Decimal>,
        sale_price: Option<Decimal>,
        storage_id: Option<Uuid>,
    ) -> Result<ProductView, AppError> {
        let company_id = access::member_company(actor)?;
        if let Some(storage_id) = storage_id {
            self.check_storage_scope(company_id, storage_id).await?;
        }
        let product: Option<Product> = self
            .catalog_repo
            .update_product(company_id, id, title, purchase_price, sale_price, storage_id)
            .await?;
        let product = product.ok_or(AppError::NotFound("Produto"))?;
        self.catalog_repo
            .find_product(company_id, product.id)
            .await?
            .ok_or(AppError::NotFound("Produto"))
    }

    pub async fn delete_product(&self, actor: &User, id: Uuid) -> Result<(), AppError> {
        let company_id = access::member_company(actor)?;
        if !self.catalog_repo.delete_product(company_id, id).await? {
            return Err(AppError::NotFound("Produto"));
        }
        Ok(())
    }
}
