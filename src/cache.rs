use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::statement::ParsedStatement;

/// Per-connection parsed-statement cache.
///
/// Repeated prepares of identical SQL text share one immutable
/// [`ParsedStatement`]. Capacity-bounded with insertion-order eviction so
/// synthesized always-different queries cannot live-leak memory.
#[derive(Debug)]
pub struct StatementCache {
    statements: HashMap<String, Arc<ParsedStatement>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl StatementCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            statements: HashMap::with_capacity(capacity.min(16)),
            order: VecDeque::with_capacity(capacity.min(16)),
            capacity,
        }
    }

    #[must_use]
    pub fn get(&self, sql: &str) -> Option<Arc<ParsedStatement>> {
        self.statements.get(sql).cloned()
    }

    pub fn put(&mut self, sql: String, parsed: Arc<ParsedStatement>) {
        if self.capacity == 0 {
            return;
        }

        if self.statements.insert(sql.clone(), parsed).is_none() {
            self.order.push_back(sql);
        }

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.statements.remove(&evicted);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
