//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{GoodKey, GoodRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateGoodParams {
    pub project_id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateGoodParams {
    pub key: GoodKey,
    pub name: String,
    /// Replaces the stored description; an empty string clears it.
    pub description: String,
}

#[async_trait]
pub trait GoodsRepo: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<GoodRecord>, RepoError>;

    /// Page through goods in storage order, removed ones included.
    async fn list_goods(&self, limit: i64, offset: i64) -> Result<Vec<GoodRecord>, RepoError>;

    async fn count_goods(&self) -> Result<u64, RepoError>;

    async fn count_removed(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait GoodsWriteRepo: Send + Sync {
    /// Insert a good at the tail of its project's priority order and return its id.
    async fn create_good(&self, params: CreateGoodParams) -> Result<i32, RepoError>;

    async fn update_good(&self, params: UpdateGoodParams) -> Result<(), RepoError>;

    async fn soft_delete_good(&self, key: GoodKey) -> Result<(), RepoError>;
}
