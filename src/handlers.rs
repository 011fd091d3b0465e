pub mod auth;
pub mod companies;
pub mod products;
pub mod storages;
pub mod suppliers;
