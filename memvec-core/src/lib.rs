pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod store;

pub use config::MemvecConfig;
pub use db::{DbOps, Row, SqlValue};
pub use error::VectorStoreError;
pub use models::{IdVector, Scope, SearchHit, SectorVector, StoredVector};
pub use store::{PgVectorStore, VectorStore, DEFAULT_TABLE};
