//! # Storage Contract
//!
//! Backends implement [`Storer`]; the handler never touches storage otherwise.

use async_trait::async_trait;
use thiserror::Error;

use crate::query::Query;

use super::context::RequestContext;
use super::item::{Item, ItemList};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Item does not exist (any more)
    #[error("Not Found")]
    NotFound,

    /// Duplicate id on insert, or the original's ETag no longer matches
    #[error("Conflict")]
    Conflict,

    /// The request was cancelled before the operation finished
    #[error("Operation canceled")]
    Canceled,

    /// The request deadline passed before the operation finished
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Any other backend failure
    #[error("Storage failure: {0}")]
    Backend(String),
}

/// Persistence backend for one resource.
///
/// Implementations must honour the [`Query`] exactly: predicate, then sort
/// with the item id as final tie breaker, then window.
#[async_trait]
pub trait Storer: Send + Sync {
    /// Matching items for the query's window; `total` counts before windowing
    async fn find(&self, ctx: &RequestContext, query: &Query) -> StorageResult<ItemList>;

    /// Stores new items; fails with `Conflict` if any id already exists
    async fn insert(&self, ctx: &RequestContext, items: Vec<Item>) -> StorageResult<()>;

    /// Replaces `original` with `item`; fails with `Conflict` when the stored
    /// ETag is no longer `original.etag`
    async fn update(&self, ctx: &RequestContext, item: Item, original: &Item) -> StorageResult<()>;

    /// Removes every item selected by the query and returns how many
    async fn delete(&self, ctx: &RequestContext, query: &Query) -> StorageResult<usize>;

    /// Removes one item, checking its ETag
    async fn delete_item(&self, ctx: &RequestContext, item: &Item) -> StorageResult<()>;
}
