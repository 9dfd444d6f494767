//! Movie catalog lookups.
//!
//! The catalog is owned elsewhere; the proxy only needs to list entries and
//! look one up by id. [`StaticCatalog`] serves the `[[catalog]]` entries from
//! the configuration file.

use async_trait::async_trait;

use crate::config::CatalogEntry;

/// Read access to stored media metadata.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// All entries, in catalog order.
    async fn list(&self) -> Vec<CatalogEntry>;

    /// Look up one entry by id.
    async fn get(&self, id: &str) -> Option<CatalogEntry>;
}

/// In-memory catalog loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl MediaCatalog for StaticCatalog {
    async fn list(&self) -> Vec<CatalogEntry> {
        self.entries.clone()
    }

    async fn get(&self, id: &str) -> Option<CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id).cloned()
    }
}
