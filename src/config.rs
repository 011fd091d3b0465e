// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CatalogRepository, CompanyRepository, StockRepository, UserRepository},
    services::{
        auth::AuthService, catalog_service::CatalogService, company_service::CompanyService,
        stock_service::{StockService, StockStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub company_service: CompanyService,
    pub catalog_service: CatalogService,
    pub stock_service: StockService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let stock_store: Arc<dyn StockStore> = Arc::new(StockRepository::new(db_pool.clone()));

        let auth_service = AuthService::new(db_pool.clone(), user_repo.clone(), jwt_secret);
        let company_service = CompanyService::new(db_pool.clone(), company_repo, user_repo);
        let catalog_service = CatalogService::new(catalog_repo);
        let stock_service = StockService::new(stock_store);

        Ok(Self {
            db_pool,
            auth_service,
            company_service,
            catalog_service,
            stock_service,
        })
    }
}
