use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::cache::{CacheError, GoodsCache};
use crate::application::repos::{
    CreateGoodParams, GoodsRepo, GoodsWriteRepo, RepoError, UpdateGoodParams,
};
use crate::domain::entities::{GoodKey, GoodRecord};
use crate::domain::error::DomainError;
use crate::domain::goods::validate_name;

pub const DEFAULT_LIST_LIMIT: i64 = 10;
pub const DEFAULT_LIST_OFFSET: i64 = 20;

#[derive(Debug, Error)]
pub enum GoodsError {
    #[error("{0}")]
    Validation(String),
    #[error("good not found")]
    NotFound,
    #[error(transparent)]
    Store(RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("good {id} was saved but the cache could not be refreshed")]
    CacheRefresh {
        id: i32,
        #[source]
        source: CacheError,
    },
}

impl From<RepoError> for GoodsError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            RepoError::InvalidInput { message } => Self::Validation(message),
            other => Self::Store(other),
        }
    }
}

impl From<DomainError> for GoodsError {
    fn from(err: DomainError) -> Self {
        let DomainError::Validation { message } = err;
        Self::Validation(message)
    }
}

/// Body of a create or update request.
#[derive(Debug, Clone, Default)]
pub struct GoodInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ListRequest {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: DEFAULT_LIST_OFFSET,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListMeta {
    pub total: u64,
    pub removed: u64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoodsPage {
    pub meta: ListMeta,
    pub goods: Vec<GoodRecord>,
}

#[derive(Clone)]
pub struct GoodsService {
    reader: Arc<dyn GoodsRepo>,
    writer: Arc<dyn GoodsWriteRepo>,
    cache: GoodsCache,
}

impl GoodsService {
    pub fn new(
        reader: Arc<dyn GoodsRepo>,
        writer: Arc<dyn GoodsWriteRepo>,
        cache: GoodsCache,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn create(&self, project_id: i32, input: GoodInput) -> Result<GoodRecord, GoodsError> {
        let name = validate_name(&input.name)?;
        let id = self
            .writer
            .create_good(CreateGoodParams {
                project_id,
                name,
                description: input.description,
            })
            .await?;

        let good = self.refresh(id).await?;
        info!(
            target = "goods::application::goods",
            id = good.id,
            project_id = good.project_id,
            priority = good.priority,
            "Good created"
        );
        Ok(good)
    }

    pub async fn update(&self, key: GoodKey, input: GoodInput) -> Result<GoodRecord, GoodsError> {
        let name = validate_name(&input.name)?;
        self.writer
            .update_good(UpdateGoodParams {
                key,
                name,
                description: input.description.unwrap_or_default(),
            })
            .await?;

        let good = self.refresh(key.id).await?;
        info!(
            target = "goods::application::goods",
            id = key.id,
            project_id = key.project_id,
            "Good updated"
        );
        Ok(good)
    }

    pub async fn remove(&self, key: GoodKey) -> Result<GoodRecord, GoodsError> {
        self.writer.soft_delete_good(key).await?;

        let good = self.refresh(key.id).await?;
        info!(
            target = "goods::application::goods",
            id = key.id,
            project_id = key.project_id,
            "Good removed"
        );
        Ok(good)
    }

    /// Cache first; misses and cache failures fall back to the store.
    pub async fn get(&self, key: GoodKey) -> Result<GoodRecord, GoodsError> {
        match self.cache.get(key.id).await {
            Ok(good) => return Ok(good),
            Err(CacheError::NotFound { .. }) => {
                debug!(target = "goods::application::goods", id = key.id, "Cache miss");
            }
            Err(err) => {
                warn!(
                    target = "goods::application::goods",
                    id = key.id,
                    error = %err,
                    "Cache read failed, falling back to store"
                );
            }
        }

        let good = self
            .reader
            .find_by_id(key.id)
            .await?
            .ok_or(GoodsError::NotFound)?;

        if let Err(err) = self.cache.put(&good).await {
            warn!(
                target = "goods::application::goods",
                id = good.id,
                error = %err,
                "Failed to repopulate cache"
            );
        }
        Ok(good)
    }

    /// Listing always reads the store. Removed goods are included.
    pub async fn list(&self, request: ListRequest) -> Result<GoodsPage, GoodsError> {
        if request.limit < 0 {
            return Err(GoodsError::Validation(
                "limit must not be negative".to_string(),
            ));
        }
        if request.offset < 0 {
            return Err(GoodsError::Validation(
                "offset must not be negative".to_string(),
            ));
        }

        let total = self.reader.count_goods().await?;
        let removed = self.reader.count_removed().await?;
        let goods = self
            .reader
            .list_goods(request.limit, request.offset)
            .await?;

        Ok(GoodsPage {
            meta: ListMeta {
                total,
                removed,
                limit: request.limit,
                offset: request.offset,
            },
            goods,
        })
    }

    pub async fn ping_cache(&self) -> Result<(), GoodsError> {
        self.cache.ping().await?;
        Ok(())
    }

    /// Re-read the committed record and overwrite its cache entry.
    async fn refresh(&self, id: i32) -> Result<GoodRecord, GoodsError> {
        let good = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(GoodsError::NotFound)?;

        self.cache
            .put(&good)
            .await
            .map_err(|source| GoodsError::CacheRefresh { id, source })?;
        Ok(good)
    }
}
