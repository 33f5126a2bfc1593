//! Canonical query object handed to storers

use super::predicate::Predicate;
use super::sort::Sort;

/// Result window: `offset` items are skipped, then at most `limit` are kept.
/// A `None` limit means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Window {
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    /// Applies the window to an already ordered vector
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Validated query. Built once per request, never mutated by storers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    predicate: Option<Predicate>,
    sort: Sort,
    window: Option<Window>,
}

impl Query {
    /// Query matching everything in storage order
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// Adds a constraint on top of the existing predicate
    pub fn and_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_apply() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(Window::new(1, Some(2)).apply(items.clone()), vec![2, 3]);
        assert_eq!(Window::new(3, None).apply(items.clone()), vec![4, 5]);
        assert_eq!(Window::new(9, Some(2)).apply(items), Vec::<i32>::new());
    }

    #[test]
    fn test_and_predicate() {
        let query = Query::new().and_predicate(Predicate::equal("a", json!(1)));
        assert_eq!(query.predicate(), Some(&Predicate::equal("a", json!(1))));

        let query = query.and_predicate(Predicate::equal("b", json!(2)));
        assert_eq!(
            query.predicate(),
            Some(&Predicate::And(vec![
                Predicate::equal("a", json!(1)),
                Predicate::equal("b", json!(2)),
            ]))
        );
    }
}
