use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::packaging::{Dimensions, PackagingResult};
use super::promise::DeliveryPromise;

pub type ProductId = u64;
pub type WarehouseId = u64;

/// Longest unit edge accepted at the boundary.
pub const MAX_DIMENSION_CM: u32 = 1_000;
/// Units a single cart may hold; packing expands one entry per unit.
pub const MAX_CART_UNITS: u64 = 10_000;

/// Origin candidates per product, as supplied by the origin repository.
pub type OriginMap = BTreeMap<ProductId, Vec<OriginMapping>>;

/// One cart line. Dimensions are optional; missing or zero values trigger the
/// packaging fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_weight_gram: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_length_cm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_width_cm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_height_cm: Option<u32>,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: u32, unit_weight_gram: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_weight_gram,
            unit_length_cm: None,
            unit_width_cm: None,
            unit_height_cm: None,
        }
    }

    pub fn with_dimensions(mut self, length_cm: u32, width_cm: u32, height_cm: u32) -> Self {
        self.unit_length_cm = Some(length_cm);
        self.unit_width_cm = Some(width_cm);
        self.unit_height_cm = Some(height_cm);
        self
    }

    /// Declared unit dimensions, present only when all three are non-zero.
    pub fn dimensions(&self) -> Option<Dimensions> {
        match (self.unit_length_cm, self.unit_width_cm, self.unit_height_cm) {
            (Some(length), Some(width), Some(height)) if length > 0 && width > 0 && height > 0 => {
                Some(Dimensions::new(length, width, height))
            }
            _ => None,
        }
    }

    pub fn line_weight_gram(&self) -> u64 {
        u64::from(self.quantity) * u64::from(self.unit_weight_gram)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.quantity == 0 {
            return Err(InputError::ZeroQuantity {
                product_id: self.product_id,
            });
        }
        if self.unit_weight_gram == 0 {
            return Err(InputError::ZeroWeight {
                product_id: self.product_id,
            });
        }
        let edges = [self.unit_length_cm, self.unit_width_cm, self.unit_height_cm];
        if edges.into_iter().flatten().any(|edge| edge > MAX_DIMENSION_CM) {
            return Err(InputError::DimensionTooLarge {
                product_id: self.product_id,
                limit: MAX_DIMENSION_CM,
            });
        }
        Ok(())
    }
}

/// Reject empty carts, invalid lines, repeated products and carts too large
/// to pack.
pub fn validate_cart(lines: &[CartLine]) -> Result<(), InputError> {
    if lines.is_empty() {
        return Err(InputError::EmptyCart);
    }

    let mut seen = HashSet::with_capacity(lines.len());
    let mut units: u64 = 0;
    for line in lines {
        line.validate()?;
        if !seen.insert(line.product_id) {
            return Err(InputError::DuplicateProduct {
                product_id: line.product_id,
            });
        }
        units += u64::from(line.quantity);
    }

    if units > MAX_CART_UNITS {
        return Err(InputError::TooManyUnits {
            units,
            limit: MAX_CART_UNITS,
        });
    }
    Ok(())
}

/// Stock position of a product at one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMapping {
    pub warehouse_id: WarehouseId,
    pub stock_qty: u32,
    pub priority: u32,
    #[serde(default)]
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub region_code: String,
    pub priority: u32,
}

impl Warehouse {
    /// Label used when a mapping points at a warehouse that is not active.
    pub fn placeholder(id: WarehouseId) -> Self {
        Self {
            id,
            name: format!("Warehouse {id}"),
            region_code: String::new(),
            priority: 999,
        }
    }
}

/// A parcel group fulfilled from one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    pub origin_region_code: String,
    pub items: Vec<CartLine>,
    pub weight_gram: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<PackagingResult>,
}

impl Shipment {
    pub fn new(warehouse: &Warehouse) -> Self {
        Self {
            warehouse_id: warehouse.id,
            warehouse_name: warehouse.name.clone(),
            origin_region_code: warehouse.region_code.clone(),
            items: Vec::new(),
            weight_gram: 0,
            packaging: None,
        }
    }

    pub fn push_item(&mut self, item: CartLine) {
        self.weight_gram += item.line_weight_gram();
        self.items.push(item);
    }

    /// Chargeable weight billed by `courier`, falling back to the `default`
    /// divisor entry and then to the raw shipment weight.
    pub fn chargeable_weight_for(&self, courier: &str) -> u64 {
        self.packaging
            .as_ref()
            .and_then(|packaging| packaging.chargeable_total_for(courier))
            .unwrap_or(self.weight_gram)
    }
}

/// Where the order is going.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub district_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub is_remote_area: bool,
}

/// A courier service price for one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub courier: String,
    pub service: String,
    pub price: u64,
    pub eta_label: String,
}

/// Price for a courier service across every shipment of the chosen plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRate {
    pub rate_id: String,
    pub courier: String,
    pub service: String,
    pub price: u64,
    pub shipment_count: u32,
    pub eta_days_max: u32,
    pub eta_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_applied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge_applied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promise: Option<DeliveryPromise>,
}

/// Boundary validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("cart has no lines")]
    EmptyCart,
    #[error("product {product_id}: quantity must be at least 1")]
    ZeroQuantity { product_id: ProductId },
    #[error("product {product_id}: unit weight must be at least 1 gram")]
    ZeroWeight { product_id: ProductId },
    #[error("product {product_id}: unit dimensions must not exceed {limit} cm")]
    DimensionTooLarge { product_id: ProductId, limit: u32 },
    #[error("product {product_id} appears on more than one line")]
    DuplicateProduct { product_id: ProductId },
    #[error("cart holds {units} units; at most {limit} can be planned")]
    TooManyUnits { units: u64, limit: u64 },
}

/// Lower-case slug with runs of non-alphanumerics collapsed to `-`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Stable identifier of a courier service, shared by aggregation and recommendation.
pub fn rate_slug(courier: &str, service: &str) -> String {
    slugify(&format!("{courier}_{service}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_require_all_three_axes() {
        let line = CartLine::new(1, 1, 100).with_dimensions(10, 0, 5);
        assert!(line.dimensions().is_none());

        let line = CartLine::new(1, 1, 100).with_dimensions(10, 4, 5);
        assert_eq!(line.dimensions(), Some(Dimensions::new(10, 4, 5)));
    }

    #[test]
    fn validate_cart_rejects_zero_quantity_and_weight() {
        assert_eq!(validate_cart(&[]), Err(InputError::EmptyCart));
        assert_eq!(
            validate_cart(&[CartLine::new(7, 0, 100)]),
            Err(InputError::ZeroQuantity { product_id: 7 })
        );
        assert_eq!(
            validate_cart(&[CartLine::new(8, 1, 0)]),
            Err(InputError::ZeroWeight { product_id: 8 })
        );
        assert!(validate_cart(&[CartLine::new(9, 2, 250)]).is_ok());
    }

    #[test]
    fn validate_cart_bounds_dimensions_and_unit_count() {
        let oversized = CartLine::new(4, 1, 100).with_dimensions(3_000_000, 10, 10);
        assert_eq!(
            validate_cart(&[oversized]),
            Err(InputError::DimensionTooLarge {
                product_id: 4,
                limit: MAX_DIMENSION_CM
            })
        );
        let longest = CartLine::new(4, 1, 100).with_dimensions(MAX_DIMENSION_CM, 10, 10);
        assert!(validate_cart(&[longest]).is_ok());

        let bulk = vec![CartLine::new(5, 6_000, 10), CartLine::new(6, 4_001, 10)];
        assert_eq!(
            validate_cart(&bulk),
            Err(InputError::TooManyUnits {
                units: 10_001,
                limit: MAX_CART_UNITS
            })
        );
        assert_eq!(
            validate_cart(&[CartLine::new(5, u32::MAX, 10)]),
            Err(InputError::TooManyUnits {
                units: u64::from(u32::MAX),
                limit: MAX_CART_UNITS
            })
        );
    }

    #[test]
    fn validate_cart_rejects_repeated_products() {
        let lines = vec![
            CartLine::new(11, 3, 200),
            CartLine::new(12, 1, 200),
            CartLine::new(11, 3, 200),
        ];
        assert_eq!(
            validate_cart(&lines),
            Err(InputError::DuplicateProduct { product_id: 11 })
        );
    }

    #[test]
    fn rate_slug_normalizes_courier_and_service() {
        assert_eq!(rate_slug("JNE", "REG"), "jne-reg");
        assert_eq!(rate_slug("J&T Express", "EZ  Next"), "j-t-express-ez-next");
    }
}
