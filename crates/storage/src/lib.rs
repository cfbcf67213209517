//! PostgreSQL storage adapter for the remit lending-event indexer.

mod postgres;

pub use postgres::{
    Database, DatabaseConfig, PgEventRepository, PgProgressRepository, PgRepositories, PurgeStats,
};
