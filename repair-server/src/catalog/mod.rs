//! Catalog / pricing provider
//!
//! Read-only lookup of `sku → price, cost, warranty` used to price line
//! items. The catalog itself is owned elsewhere; [`InMemoryCatalog`] is the
//! cache the server loads it into.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared::order::LineItemKind;
use std::sync::Arc;

/// One sellable service, part or package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub sku: String,
    pub name: String,
    pub kind: LineItemKind,
    pub price: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub warranty_days: u32,
}

/// Pricing lookup consumed by the order engine
pub trait CatalogProvider: Send + Sync {
    fn lookup(&self, sku: &str) -> Option<CatalogEntry>;
}

/// Concurrent in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Arc<DashMap<String, CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let catalog = Self::new();
        for entry in entries {
            catalog.upsert(entry);
        }
        catalog
    }

    /// Insert or replace an entry
    pub fn upsert(&self, entry: CatalogEntry) {
        self.entries.insert(entry.sku.clone(), entry);
    }

    pub fn remove(&self, sku: &str) -> Option<CatalogEntry> {
        self.entries.remove(sku).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load entries from a JSON array file
    pub fn load_json(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            count = entries.len(),
            "Catalog loaded"
        );
        Ok(Self::with_entries(entries))
    }
}

impl CatalogProvider for InMemoryCatalog {
    fn lookup(&self, sku: &str) -> Option<CatalogEntry> {
        self.entries.get(sku).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sku: &str, price: f64) -> CatalogEntry {
        CatalogEntry {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            kind: LineItemKind::Service,
            price,
            cost: price / 2.0,
            warranty_days: 30,
        }
    }

    #[test]
    fn test_lookup_and_upsert() {
        let catalog = InMemoryCatalog::with_entries([entry("SVC-FORMAT", 350.0)]);
        assert_eq!(catalog.lookup("SVC-FORMAT").unwrap().price, 350.0);
        assert!(catalog.lookup("missing").is_none());

        catalog.upsert(entry("SVC-FORMAT", 400.0));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("SVC-FORMAT").unwrap().price, 400.0);
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"sku":"PART-SSD","name":"SSD 500GB","kind":"PART","price":900.0,"cost":600.0,"warranty_days":365}]"#,
        )
        .unwrap();

        let catalog = InMemoryCatalog::load_json(&path).unwrap();
        let ssd = catalog.lookup("PART-SSD").unwrap();
        assert_eq!(ssd.kind, LineItemKind::Part);
        assert_eq!(ssd.warranty_days, 365);
    }
}
