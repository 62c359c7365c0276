//! Warehouses and per-product origin stock.

mod import;
mod parser;

pub use import::{import_catalog, CatalogImportError};

use std::collections::BTreeMap;

use crate::shipping::{OriginMap, OriginMapping, ProductId, Warehouse};

/// Storage abstraction feeding the planner.
pub trait OriginRepository: Send + Sync {
    /// Active warehouses ordered by (priority, id).
    fn active_warehouses(&self) -> Result<Vec<Warehouse>, RepositoryError>;
    /// Mappings for the requested products, each list ordered by
    /// (priority, warehouse_id). Products without mappings are omitted.
    fn origin_map(&self, product_ids: &[ProductId]) -> Result<OriginMap, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("origin mapping for product {product_id} at warehouse {warehouse_id} already exists")]
    Conflict {
        product_id: ProductId,
        warehouse_id: u64,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Catalog held entirely in memory; loaded from CSV or built in code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOriginCatalog {
    warehouses: Vec<Warehouse>,
    origins: BTreeMap<ProductId, Vec<OriginMapping>>,
}

impl InMemoryOriginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warehouse(mut self, warehouse: Warehouse) -> Self {
        self.add_warehouse(warehouse);
        self
    }

    pub fn with_origin(
        mut self,
        product_id: ProductId,
        mapping: OriginMapping,
    ) -> Result<Self, RepositoryError> {
        self.add_origin(product_id, mapping)?;
        Ok(self)
    }

    /// Insert or replace a warehouse.
    pub fn add_warehouse(&mut self, warehouse: Warehouse) {
        self.warehouses.retain(|existing| existing.id != warehouse.id);
        self.warehouses.push(warehouse);
        self.warehouses
            .sort_by_key(|warehouse| (warehouse.priority, warehouse.id));
    }

    pub fn add_origin(
        &mut self,
        product_id: ProductId,
        mapping: OriginMapping,
    ) -> Result<(), RepositoryError> {
        let mappings = self.origins.entry(product_id).or_default();
        if mappings
            .iter()
            .any(|existing| existing.warehouse_id == mapping.warehouse_id)
        {
            return Err(RepositoryError::Conflict {
                product_id,
                warehouse_id: mapping.warehouse_id,
            });
        }
        mappings.push(mapping);
        mappings.sort_by_key(|mapping| (mapping.priority, mapping.warehouse_id));
        Ok(())
    }

    pub fn warehouse_count(&self) -> usize {
        self.warehouses.len()
    }

    pub fn product_count(&self) -> usize {
        self.origins.len()
    }
}

impl OriginRepository for InMemoryOriginCatalog {
    fn active_warehouses(&self) -> Result<Vec<Warehouse>, RepositoryError> {
        Ok(self.warehouses.clone())
    }

    fn origin_map(&self, product_ids: &[ProductId]) -> Result<OriginMap, RepositoryError> {
        Ok(product_ids
            .iter()
            .filter_map(|product_id| {
                self.origins
                    .get(product_id)
                    .map(|mappings| (*product_id, mappings.clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(warehouse_id: u64, priority: u32) -> OriginMapping {
        OriginMapping {
            warehouse_id,
            stock_qty: 5,
            priority,
            is_fallback: false,
        }
    }

    #[test]
    fn origin_map_orders_mappings_and_skips_unknown_products() {
        let catalog = InMemoryOriginCatalog::new()
            .with_origin(1, mapping(9, 2))
            .and_then(|catalog| catalog.with_origin(1, mapping(3, 2)))
            .and_then(|catalog| catalog.with_origin(1, mapping(4, 1)))
            .expect("catalog builds");

        let map = catalog.origin_map(&[1, 2]).expect("map");
        assert_eq!(map.len(), 1);
        let order: Vec<u64> = map[&1].iter().map(|m| m.warehouse_id).collect();
        assert_eq!(order, vec![4, 3, 9]);
    }

    #[test]
    fn duplicate_origin_is_a_conflict() {
        let result = InMemoryOriginCatalog::new()
            .with_origin(1, mapping(9, 2))
            .and_then(|catalog| catalog.with_origin(1, mapping(9, 5)));
        assert!(matches!(
            result,
            Err(RepositoryError::Conflict {
                product_id: 1,
                warehouse_id: 9
            })
        ));
    }

    #[test]
    fn warehouses_sorted_by_priority_then_id() {
        let warehouse = |id: u64, priority: u32| Warehouse {
            id,
            name: format!("W{id}"),
            region_code: "JKT".to_string(),
            priority,
        };
        let catalog = InMemoryOriginCatalog::new()
            .with_warehouse(warehouse(3, 5))
            .with_warehouse(warehouse(1, 5))
            .with_warehouse(warehouse(2, 1));

        let ids: Vec<u64> = catalog
            .active_warehouses()
            .expect("warehouses")
            .iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
