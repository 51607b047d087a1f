//! SQLite persistence for bomtree.
//!
//! [`Database`] owns the connection pool and is created once per process.
//! Repositories and the [`BomService`] borrow it.

pub mod config;
pub mod db;
pub mod error;
pub mod project;
pub mod repository;
mod row;
pub mod service;

pub use config::StoreConfig;
pub use db::Database;
pub use error::{Result, StoreError};
pub use project::ProjectRepository;
pub use repository::BomRepository;
pub use service::BomService;
