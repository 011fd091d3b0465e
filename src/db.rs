pub mod user_repo;
pub use user_repo::UserRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
