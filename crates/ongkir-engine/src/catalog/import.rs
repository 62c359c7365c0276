use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::parser::{parse_origins, parse_warehouses};
use super::{InMemoryOriginCatalog, RepositoryError};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Catalog(RepositoryError),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog export: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::Catalog(err) => {
                write!(f, "could not build origin catalog: {}", err)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::Catalog(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for CatalogImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Catalog(err)
    }
}

impl InMemoryOriginCatalog {
    /// Build a catalog from `warehouses.csv` and `product_origins.csv` exports.
    pub fn from_csv_paths<P, Q>(warehouses: P, origins: Q) -> Result<Self, CatalogImportError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let warehouses = File::open(warehouses)?;
        let origins = File::open(origins)?;
        import_catalog(warehouses, origins)
    }
}

pub fn import_catalog<W: Read, O: Read>(
    warehouses: W,
    origins: O,
) -> Result<InMemoryOriginCatalog, CatalogImportError> {
    let mut catalog = InMemoryOriginCatalog::new();
    for warehouse in parse_warehouses(warehouses)? {
        catalog.add_warehouse(warehouse);
    }
    for (product_id, mapping) in parse_origins(origins)? {
        catalog.add_origin(product_id, mapping)?;
    }

    tracing::info!(
        warehouses = catalog.warehouse_count(),
        products = catalog.product_count(),
        "origin catalog imported"
    );
    Ok(catalog)
}
