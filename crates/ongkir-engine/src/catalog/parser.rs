use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::shipping::{OriginMapping, ProductId, Warehouse};

#[derive(Debug, Deserialize)]
struct WarehouseRow {
    id: u64,
    name: String,
    region_code: String,
    #[serde(default)]
    priority: u32,
    #[serde(default = "active_by_default", deserialize_with = "flag")]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct OriginRow {
    product_id: ProductId,
    warehouse_id: u64,
    #[serde(default)]
    stock_qty: u32,
    #[serde(default)]
    priority: u32,
    #[serde(default, deserialize_with = "flag")]
    is_fallback: bool,
}

fn active_by_default() -> bool {
    true
}

/// Accepts 1/0, true/false, yes/no; blank reads as false.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "" | "0" | "false" | "no" | "n" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Active warehouses from `id,name,region_code,priority,is_active`.
pub(crate) fn parse_warehouses<R: Read>(reader: R) -> Result<Vec<Warehouse>, csv::Error> {
    let mut warehouses = Vec::new();
    for record in csv_reader(reader).deserialize::<WarehouseRow>() {
        let row = record?;
        if !row.is_active {
            continue;
        }
        warehouses.push(Warehouse {
            id: row.id,
            name: row.name,
            region_code: row.region_code,
            priority: row.priority,
        });
    }
    Ok(warehouses)
}

/// Rows of `product_id,warehouse_id,stock_qty,priority,is_fallback`.
pub(crate) fn parse_origins<R: Read>(
    reader: R,
) -> Result<Vec<(ProductId, OriginMapping)>, csv::Error> {
    let mut origins = Vec::new();
    for record in csv_reader(reader).deserialize::<OriginRow>() {
        let row = record?;
        origins.push((
            row.product_id,
            OriginMapping {
                warehouse_id: row.warehouse_id,
                stock_qty: row.stock_qty,
                priority: row.priority,
                is_fallback: row.is_fallback,
            },
        ));
    }
    Ok(origins)
}
