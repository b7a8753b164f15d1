//! Assessment result storage
//!
//! Callers inject a store to keep reports between requests; the engine itself
//! holds no results.

use crate::assessment::AssessmentReport;
use async_trait::async_trait;
use onesecure_common::types::Domain;
use onesecure_common::Result;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Report store with get/put semantics
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store a report under its id, replacing any previous report with that id
    async fn put(&self, report: AssessmentReport) -> Result<()>;

    /// Get a report by id
    async fn get(&self, id: Uuid) -> Result<Option<AssessmentReport>>;

    /// Most recently stored report for a domain
    async fn latest_for_domain(&self, domain: &Domain) -> Result<Option<AssessmentReport>>;
}

#[derive(Default)]
struct StoreInner {
    reports: HashMap<Uuid, AssessmentReport>,
    /// Insertion order, oldest first
    order: VecDeque<Uuid>,
}

/// In-memory store, optionally bounded
#[derive(Default)]
pub struct InMemoryResultStore {
    capacity: Option<usize>,
    inner: RwLock<StoreInner>,
}

impl InMemoryResultStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store keeping at most `capacity` reports, evicting the oldest
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.reports.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.reports.is_empty()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put(&self, report: AssessmentReport) -> Result<()> {
        let mut inner = self.inner.write().await;
        let id = report.id;

        if inner.reports.insert(id, report).is_some() {
            inner.order.retain(|existing| *existing != id);
        }
        inner.order.push_back(id);

        if let Some(capacity) = self.capacity {
            while inner.order.len() > capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.reports.remove(&evicted);
                    debug!("Evicted assessment {} from result store", evicted);
                }
            }
        }

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AssessmentReport>> {
        Ok(self.inner.read().await.reports.get(&id).cloned())
    }

    async fn latest_for_domain(&self, domain: &Domain) -> Result<Option<AssessmentReport>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.reports.get(id))
            .find(|report| &report.domain == domain)
            .cloned())
    }
}
