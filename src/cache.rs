use std::sync::Arc;

use dashmap::DashMap;

use crate::ast::Expr;

/// Store for parsed queries, keyed by the exact query text.
///
/// Implementations must be safe to share between threads; a [`Runner`]
/// holds its cache behind an `Arc` and several runners may share one.
///
/// [`Runner`]: crate::Runner
pub trait Cache: Send + Sync {
    fn get(&self, query: &str) -> Option<Arc<Expr>>;

    /// Stores `expr` unless another entry for `query` got there first, and
    /// returns whichever entry is now stored.
    fn insert(&self, query: &str, expr: Arc<Expr>) -> Arc<Expr>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`Cache`] on a concurrent map. Entries live until [`clear`].
///
/// Only syntax trees are stored, never evaluation results, so one cache can
/// back runners with different globals or interceptors.
///
/// [`clear`]: QueryCache::clear
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<String, Arc<Expr>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh cache ready to hand to one or more runners.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Cache for QueryCache {
    fn get(&self, query: &str) -> Option<Arc<Expr>> {
        self.entries.get(query).map(|entry| Arc::clone(entry.value()))
    }

    fn insert(&self, query: &str, expr: Arc<Expr>) -> Arc<Expr> {
        let entry = self.entries.entry(query.to_string()).or_insert(expr);
        Arc::clone(entry.value())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
