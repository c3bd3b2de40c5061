//! Generation handle
//!
//! Readers take an `Arc` snapshot of the current generation and keep it for
//! the whole query; a refresh swaps in a fresh generation without disturbing
//! them.

use crate::StatsEngine;
use chrono::{DateTime, Utc};
use statline_ir::TableCatalog;
use statline_registry::DatasetRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;

/// One immutable view of the engine.
pub struct Generation {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub engine: StatsEngine,
}

pub struct EngineHandle {
    current: RwLock<Arc<Generation>>,
    next_id: AtomicU64,
}

impl EngineHandle {
    pub fn new(catalog: Arc<dyn TableCatalog>, registry: Arc<DatasetRegistry>) -> Self {
        let first = Generation {
            id: 1,
            created_at: Utc::now(),
            engine: StatsEngine::new(catalog, registry),
        };
        Self {
            current: RwLock::new(Arc::new(first)),
            next_id: AtomicU64::new(2),
        }
    }

    /// The current generation. Holders are unaffected by later refreshes.
    pub fn snapshot(&self) -> Arc<Generation> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().id
    }

    /// Rebuild the engine over the current catalog and registry.
    pub fn refresh(&self) -> Arc<Generation> {
        let current = self.snapshot();
        self.install(
            Arc::clone(current.engine.catalog()),
            Arc::clone(current.engine.registry()),
        )
    }

    /// Swap in an engine over a different catalog.
    pub fn replace_catalog(&self, catalog: Arc<dyn TableCatalog>) -> Arc<Generation> {
        let registry = Arc::clone(self.snapshot().engine.registry());
        self.install(catalog, registry)
    }

    fn install(&self, catalog: Arc<dyn TableCatalog>, registry: Arc<DatasetRegistry>) -> Arc<Generation> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let generation = Arc::new(Generation {
            id,
            created_at: Utc::now(),
            engine: StatsEngine::new(catalog, registry),
        });

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::clone(&generation);
        info!(
            generation = id,
            created_at = %generation.created_at.to_rfc3339(),
            "Installed new engine generation"
        );
        generation
    }
}
