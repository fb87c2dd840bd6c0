pub mod campaign;
pub mod domain;
pub mod errors;
pub mod models;
pub mod recipients;
pub mod repository;
pub mod schema;
pub mod settings;
pub mod subscribers;
