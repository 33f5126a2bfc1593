//! # In-Memory Storer
//!
//! Reference [`Storer`] keeping items in a vector behind a lock.
//!
//! Ordering is the query's sort with the item id as final tie breaker, so
//! windows and bulk deletes are deterministic.

use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::query::{compare_total, Query};
use crate::resource::{Item, ItemList, RequestContext, StorageError, StorageResult, Storer};

/// In-memory storer for tests and the demo server
#[derive(Debug, Default)]
pub struct MemoryStorer {
    items: RwLock<Vec<Item>>,
}

impl MemoryStorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storer preloaded with `items`
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored item in id order
    pub fn snapshot(&self) -> StorageResult<Vec<Item>> {
        let items = self.items.read().map_err(|_| poisoned())?;
        let mut all = items.clone();
        all.sort_by(|a, b| compare_total(Some(&a.id), Some(&b.id)));
        Ok(all)
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("Lock poisoned".to_string())
}

/// Items matching the query's predicate, ordered, before windowing
fn select<'a>(items: &'a [Item], query: &Query) -> Vec<&'a Item> {
    let mut selected: Vec<&Item> = items
        .iter()
        .filter(|item| query.predicate().map_or(true, |p| p.matches(&item.payload)))
        .collect();
    selected.sort_by(|a, b| {
        match query.sort().compare(&a.payload, &b.payload) {
            Ordering::Equal => compare_total(Some(&a.id), Some(&b.id)),
            ordering => ordering,
        }
    });
    selected
}

fn windowed<'a>(selected: Vec<&'a Item>, query: &Query) -> Vec<&'a Item> {
    match query.window() {
        Some(window) => window.apply(selected),
        None => selected,
    }
}

#[async_trait]
impl Storer for MemoryStorer {
    async fn find(&self, ctx: &RequestContext, query: &Query) -> StorageResult<ItemList> {
        ctx.check()?;
        let items = self.items.read().map_err(|_| poisoned())?;

        let selected = select(&items, query);
        let total = selected.len();
        let page = windowed(selected, query);
        let window = query.window();

        Ok(ItemList {
            total,
            offset: window.map_or(0, |w| w.offset),
            limit: window.and_then(|w| w.limit),
            items: page.into_iter().cloned().collect(),
        })
    }

    async fn insert(&self, ctx: &RequestContext, new_items: Vec<Item>) -> StorageResult<()> {
        ctx.check()?;
        let mut items = self.items.write().map_err(|_| poisoned())?;

        for (i, item) in new_items.iter().enumerate() {
            let taken = items.iter().any(|existing| existing.id == item.id)
                || new_items[..i].iter().any(|other| other.id == item.id);
            if taken {
                return Err(StorageError::Conflict);
            }
        }
        items.extend(new_items);
        Ok(())
    }

    async fn update(&self, ctx: &RequestContext, item: Item, original: &Item) -> StorageResult<()> {
        ctx.check()?;
        let mut items = self.items.write().map_err(|_| poisoned())?;

        let slot = items
            .iter_mut()
            .find(|existing| existing.id == original.id)
            .ok_or(StorageError::NotFound)?;
        if slot.etag != original.etag {
            return Err(StorageError::Conflict);
        }
        *slot = item;
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, query: &Query) -> StorageResult<usize> {
        ctx.check()?;
        let mut items = self.items.write().map_err(|_| poisoned())?;

        let doomed: Vec<_> = windowed(select(&items, query), query)
            .into_iter()
            .map(|item| item.id.clone())
            .collect();

        let mut removed = 0;
        for id in doomed {
            ctx.check()?;
            if let Some(pos) = items.iter().position(|item| item.id == id) {
                items.remove(pos);
                removed += 1;
            }
        }
        debug!(request_id = %ctx.request_id, removed, "bulk delete");
        Ok(removed)
    }

    async fn delete_item(&self, ctx: &RequestContext, item: &Item) -> StorageResult<()> {
        ctx.check()?;
        let mut items = self.items.write().map_err(|_| poisoned())?;

        let pos = items
            .iter()
            .position(|existing| existing.id == item.id)
            .ok_or(StorageError::NotFound)?;
        if items[pos].etag != item.etag {
            return Err(StorageError::Conflict);
        }
        items.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Predicate, Sort, Window};
    use serde_json::{json, Value};

    fn item(id: i64, foo: &str) -> Item {
        let payload = json!({"foo": foo}).as_object().cloned().unwrap();
        Item::new(json!(id), payload)
    }

    fn five() -> MemoryStorer {
        MemoryStorer::with_items(vec![
            item(3, "odd"),
            item(1, "odd"),
            item(4, "even"),
            item(2, "even"),
            item(5, "odd"),
        ])
    }

    fn ids(items: &[Item]) -> Vec<Value> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_find_orders_by_id_then_windows() {
        let storer = five();
        let ctx = RequestContext::new();

        let query = Query::new().with_window(Window::new(1, Some(2)));
        let list = storer.find(&ctx, &query).await.unwrap();
        assert_eq!(list.total, 5);
        assert_eq!(list.offset, 1);
        assert_eq!(list.limit, Some(2));
        assert_eq!(ids(&list.items), vec![json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_find_with_sort_and_filter() {
        let storer = five();
        let ctx = RequestContext::new();

        let query = Query::new()
            .with_predicate(Predicate::equal("foo", json!("odd")))
            .with_sort(Sort::parse("-id").unwrap());
        let list = storer.find(&ctx, &query).await.unwrap();
        assert_eq!(list.total, 3);
        assert_eq!(ids(&list.items), vec![json!(5), json!(3), json!(1)]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let storer = five();
        let ctx = RequestContext::new();

        let err = storer.insert(&ctx, vec![item(1, "dup")]).await.unwrap_err();
        assert_eq!(err, StorageError::Conflict);

        let err = storer
            .insert(&ctx, vec![item(9, "a"), item(9, "b")])
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::Conflict);
        assert_eq!(storer.len(), 5);
    }

    #[tokio::test]
    async fn test_update_detects_stale_original() {
        let storer = five();
        let ctx = RequestContext::new();
        let original = storer.snapshot().unwrap()[0].clone();

        let first = item(1, "changed");
        storer.update(&ctx, first, &original).await.unwrap();

        // second writer still holds the old ETag
        let err = storer
            .update(&ctx, item(1, "again"), &original)
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::Conflict);
    }

    #[tokio::test]
    async fn test_delete_windowed() {
        let storer = five();
        let ctx = RequestContext::new();

        let query = Query::new()
            .with_predicate(Predicate::equal("foo", json!("odd")))
            .with_window(Window::new(1, Some(2)));
        assert_eq!(storer.delete(&ctx, &query).await.unwrap(), 2);
        assert_eq!(
            ids(&storer.snapshot().unwrap()),
            vec![json!(1), json!(2), json!(4)]
        );
    }

    #[tokio::test]
    async fn test_delete_item() {
        let storer = five();
        let ctx = RequestContext::new();
        let target = storer.snapshot().unwrap()[1].clone();

        let mut stale = target.clone();
        stale.etag = "stale".into();
        assert_eq!(
            storer.delete_item(&ctx, &stale).await.unwrap_err(),
            StorageError::Conflict
        );

        storer.delete_item(&ctx, &target).await.unwrap();
        assert_eq!(
            storer.delete_item(&ctx, &target).await.unwrap_err(),
            StorageError::NotFound
        );
        assert_eq!(storer.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_work() {
        let storer = five();
        let (ctx, handle) = RequestContext::cancellable();
        handle.cancel();

        assert_eq!(
            storer.delete(&ctx, &Query::new()).await.unwrap_err(),
            StorageError::Canceled
        );
        assert_eq!(storer.len(), 5);
    }
}
