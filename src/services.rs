pub mod access;
pub mod auth;
pub mod catalog_service;
pub mod company_service;
pub mod stock_service;
