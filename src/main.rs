//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de autenticação (públicas)
    let auth_public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/token/refresh", post(handlers::auth::refresh));

    // Rotas de conta e quadro de funcionários (protegidas)
    let auth_protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/employees", get(handlers::auth::list_employees))
        .route("/employees/add", post(handlers::auth::add_employee))
        .route(
            "/employees/{id}/remove",
            delete(handlers::auth::remove_employee),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let company_routes = Router::new()
        .route(
            "/",
            get(handlers::companies::list_companies).post(handlers::companies::create_company),
        )
        .route(
            "/join-requests",
            get(handlers::companies::list_join_requests),
        )
        .route(
            "/join-requests/{id}/approve",
            post(handlers::companies::approve_join_request),
        )
        .route(
            "/join-requests/{id}/reject",
            post(handlers::companies::reject_join_request),
        )
        .route(
            "/{id}",
            get(handlers::companies::get_company)
                .put(handlers::companies::update_company)
                .patch(handlers::companies::update_company)
                .delete(handlers::companies::delete_company),
        )
        .route("/{id}/join", post(handlers::companies::request_join))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let storage_routes = Router::new()
        .route(
            "/",
            get(handlers::storages::list_storages).post(handlers::storages::create_storage),
        )
        .route(
            "/{id}",
            get(handlers::storages::get_storage)
                .put(handlers::storages::update_storage)
                .patch(handlers::storages::update_storage)
                .delete(handlers::storages::delete_storage),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let supplier_routes = Router::new()
        .route(
            "/",
            get(handlers::suppliers::list_suppliers).post(handlers::suppliers::create_supplier),
        )
        .route(
            "/{id}",
            get(handlers::suppliers::get_supplier)
                .put(handlers::suppliers::update_supplier)
                .patch(handlers::suppliers::update_supplier)
                .delete(handlers::suppliers::delete_supplier),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Fornecimentos e vendas moram sob /products: são os dois únicos
    // caminhos de escrita do saldo.
    let product_routes = Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/supplies",
            get(handlers::products::list_supplies).post(handlers::products::create_supply),
        )
        .route("/supplies/{id}", get(handlers::products::get_supply))
        .route(
            "/sales",
            get(handlers::products::list_sales).post(handlers::products::create_sale),
        )
        .route(
            "/sales/{id}",
            get(handlers::products::get_sale)
                .put(handlers::products::update_sale)
                .patch(handlers::products::update_sale),
        )
        .route(
            "/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .patch(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_public_routes.merge(auth_protected_routes))
        .nest("/api/companies", company_routes)
        .nest("/api/storages", storage_routes)
        .nest("/api/suppliers", supplier_routes)
        .nest("/api/products", product_routes)
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
