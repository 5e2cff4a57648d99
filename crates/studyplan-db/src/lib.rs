//! Persistence layer for studyplan: configuration, SQLite pool, embedded
//! migrations, row models, and task queries.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
