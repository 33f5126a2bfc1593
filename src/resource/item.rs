//! Stored items and result pages

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::schema::{Document, ID_FIELD};

/// Field map of an item
pub type Payload = Document;

/// One stored document with its version token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    /// Identity, mirrored in `payload["id"]`
    pub id: Value,
    /// SHA-256 hex of the canonical payload
    pub etag: String,
    pub updated: DateTime<Utc>,
    pub payload: Payload,
}

impl Item {
    /// Builds an item, writing `id` into the payload and computing its ETag
    pub fn new(id: Value, mut payload: Payload) -> Self {
        payload.insert(ID_FIELD.to_string(), id.clone());
        let etag = Self::compute_etag(&payload);
        Self {
            id,
            etag,
            updated: Utc::now(),
            payload,
        }
    }

    /// Keys serialize in sorted order, so equal payloads share an ETag
    pub fn compute_etag(payload: &Payload) -> String {
        let bytes = serde_json::to_vec(payload).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }

    /// Compares an `If-Match` header value with this item's ETag.
    ///
    /// Accepts quoted and weak (`W/"..."`) forms, and `*`.
    pub fn matches_etag(&self, header: &str) -> bool {
        let header = header.trim();
        if header == "*" {
            return true;
        }
        let tag = header.strip_prefix("W/").unwrap_or(header);
        tag.trim_matches('"') == self.etag
    }
}

/// One page of a `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemList {
    /// Matching items before windowing
    pub total: usize,
    pub offset: usize,
    pub limit: Option<usize>,
    pub items: Vec<Item>,
}
