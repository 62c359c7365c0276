use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CartLine, ProductId};

pub const DEFAULT_BOX_MAX_WEIGHT_GRAM: u32 = 30_000;
pub const CUSTOM_BOX_MIN_WEIGHT_GRAM: u64 = 50_000;
pub const DEFAULT_VOLUMETRIC_DIVISOR: u32 = 6_000;
pub const DEFAULT_DIVISOR_KEY: &str = "default";

/// Courier code to volumetric divisor (cm³ per kg).
pub type VolumetricDivisors = BTreeMap<String, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
}

impl Dimensions {
    pub const fn new(length_cm: u32, width_cm: u32, height_cm: u32) -> Self {
        Self {
            length_cm,
            width_cm,
            height_cm,
        }
    }

    /// Saturates at `u64::MAX` for edges no real parcel has.
    pub fn volume_cm3(&self) -> u64 {
        u64::from(self.length_cm)
            .saturating_mul(u64::from(self.width_cm))
            .saturating_mul(u64::from(self.height_cm))
    }

    /// Axis-aligned containment; units are never rotated.
    pub fn fits_within(&self, inner: &Dimensions) -> bool {
        self.length_cm <= inner.length_cm
            && self.width_cm <= inner.width_cm
            && self.height_cm <= inner.height_cm
    }

    fn clamped(self) -> Self {
        Self::new(
            self.length_cm.max(1),
            self.width_cm.max(1),
            self.height_cm.max(1),
        )
    }
}

/// Unit dimensions assumed when a product has none on record.
impl Default for Dimensions {
    fn default() -> Self {
        Self::new(10, 10, 10)
    }
}

/// A box the store has in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxPreset {
    pub id: String,
    pub name: String,
    pub inner_length_cm: u32,
    pub inner_width_cm: u32,
    pub inner_height_cm: u32,
    #[serde(default = "default_box_max_weight")]
    pub max_weight_gram: u32,
}

fn default_box_max_weight() -> u32 {
    DEFAULT_BOX_MAX_WEIGHT_GRAM
}

impl BoxPreset {
    pub fn new(id: &str, name: &str, inner: Dimensions, max_weight_gram: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            inner_length_cm: inner.length_cm,
            inner_width_cm: inner.width_cm,
            inner_height_cm: inner.height_cm,
            max_weight_gram,
        }
    }

    pub fn inner(&self) -> Dimensions {
        Dimensions::new(
            self.inner_length_cm,
            self.inner_width_cm,
            self.inner_height_cm,
        )
    }

    /// Presets ship with small, medium and large cubes.
    pub fn builtin() -> Vec<BoxPreset> {
        vec![
            BoxPreset::new("small", "Small box", Dimensions::new(20, 20, 20), 5_000),
            BoxPreset::new("medium", "Medium box", Dimensions::new(30, 30, 30), 15_000),
            BoxPreset::new("large", "Large box", Dimensions::new(40, 40, 40), 30_000),
        ]
    }
}

/// Box actually used by a package: a preset, or a custom box cut to one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageBox {
    pub id: String,
    pub name: String,
    pub inner: Dimensions,
    pub max_weight_gram: u64,
    pub volume_cm3: u64,
}

impl PackageBox {
    fn from_preset(preset: &BoxPreset) -> Self {
        let inner = preset.inner().clamped();
        Self {
            id: preset.id.clone(),
            name: preset.name.clone(),
            inner,
            max_weight_gram: u64::from(preset.max_weight_gram.max(1)),
            volume_cm3: inner.volume_cm3(),
        }
    }

    /// Whether an empty box of this kind takes `unit`.
    fn takes(&self, unit: &PackingUnit) -> bool {
        unit.dimensions.fits_within(&self.inner)
            && unit.weight_gram <= self.max_weight_gram
            && unit.volume_cm3 <= self.volume_cm3
    }

    fn custom_for(unit: &PackingUnit) -> Self {
        Self {
            id: format!("custom-{}", unit.product_id),
            name: "Custom package".to_string(),
            inner: unit.dimensions,
            max_weight_gram: unit.weight_gram.max(CUSTOM_BOX_MIN_WEIGHT_GRAM),
            volume_cm3: unit.volume_cm3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub dimension_fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub package_no: u32,
    #[serde(rename = "box")]
    pub container: PackageBox,
    pub items: Vec<PackageItem>,
    pub used_volume_cm3: u64,
    pub actual_weight_gram: u64,
    pub volumetric_weight_gram_by_courier: BTreeMap<String, u64>,
    pub chargeable_weight_gram_by_courier: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingResult {
    pub packages: Vec<Package>,
    pub chargeable_total_by_courier: BTreeMap<String, u64>,
    pub dimension_fallback_used: bool,
}

impl PackagingResult {
    /// Chargeable total for `courier`, or the `default` divisor's total.
    pub fn chargeable_total_for(&self, courier: &str) -> Option<u64> {
        self.chargeable_total_by_courier
            .get(courier)
            .or_else(|| self.chargeable_total_by_courier.get(DEFAULT_DIVISOR_KEY))
            .copied()
    }

    pub fn actual_weight_gram(&self) -> u64 {
        self.packages
            .iter()
            .map(|package| package.actual_weight_gram)
            .sum()
    }
}

struct PackingUnit {
    product_id: ProductId,
    weight_gram: u64,
    dimensions: Dimensions,
    volume_cm3: u64,
    dimension_fallback_used: bool,
}

struct OpenPackage {
    container: PackageBox,
    used_volume_cm3: u64,
    actual_weight_gram: u64,
    items: Vec<PackageItem>,
}

impl OpenPackage {
    fn new(container: PackageBox) -> Self {
        Self {
            container,
            used_volume_cm3: 0,
            actual_weight_gram: 0,
            items: Vec::new(),
        }
    }

    fn accepts(&self, unit: &PackingUnit) -> bool {
        unit.dimensions.fits_within(&self.container.inner)
            && self.actual_weight_gram.saturating_add(unit.weight_gram)
                <= self.container.max_weight_gram
            && self.used_volume_cm3.saturating_add(unit.volume_cm3) <= self.container.volume_cm3
    }

    fn place(&mut self, unit: &PackingUnit) {
        self.used_volume_cm3 = self.used_volume_cm3.saturating_add(unit.volume_cm3);
        self.actual_weight_gram = self.actual_weight_gram.saturating_add(unit.weight_gram);
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == unit.product_id)
        {
            Some(item) => {
                item.quantity += 1;
                item.dimension_fallback_used |= unit.dimension_fallback_used;
            }
            None => self.items.push(PackageItem {
                product_id: unit.product_id,
                quantity: 1,
                dimension_fallback_used: unit.dimension_fallback_used,
            }),
        }
    }
}

/// Pack shipment items into boxes and compute per-courier chargeable weight.
///
/// Units are expanded one per quantity, sorted largest first and placed
/// first-fit into open packages; a unit that fits nowhere opens the smallest
/// preset that takes it, or a custom box sized to the unit.
pub fn optimize_packaging(
    items: &[CartLine],
    presets: &[BoxPreset],
    divisors: &VolumetricDivisors,
    fallback: Dimensions,
) -> PackagingResult {
    let mut units = expand_units(items, fallback);
    // Stable: equal keys keep input order.
    units.sort_by(|a, b| {
        (b.volume_cm3, b.weight_gram).cmp(&(a.volume_cm3, a.weight_gram))
    });

    let mut boxes: Vec<PackageBox> = presets.iter().map(PackageBox::from_preset).collect();
    boxes.sort_by_key(|container| container.volume_cm3);

    let mut open: Vec<OpenPackage> = Vec::new();
    for unit in &units {
        if let Some(package) = open.iter_mut().find(|package| package.accepts(unit)) {
            package.place(unit);
            continue;
        }

        let container = boxes
            .iter()
            .find(|container| container.takes(unit))
            .cloned()
            .unwrap_or_else(|| PackageBox::custom_for(unit));
        let mut package = OpenPackage::new(container);
        package.place(unit);
        open.push(package);
    }

    let divisors = effective_divisors(divisors);
    let mut chargeable_total_by_courier: BTreeMap<String, u64> =
        divisors.keys().map(|courier| (courier.clone(), 0)).collect();

    let packages: Vec<Package> = open
        .into_iter()
        .enumerate()
        .map(|(position, package)| {
            let mut volumetric = BTreeMap::new();
            let mut chargeable = BTreeMap::new();
            for (courier, divisor) in &divisors {
                let volumetric_weight = volumetric_weight_gram(package.used_volume_cm3, *divisor);
                let chargeable_weight = package.actual_weight_gram.max(volumetric_weight);
                volumetric.insert(courier.clone(), volumetric_weight);
                chargeable.insert(courier.clone(), chargeable_weight);
                if let Some(total) = chargeable_total_by_courier.get_mut(courier) {
                    *total = total.saturating_add(chargeable_weight);
                }
            }

            Package {
                package_no: position as u32 + 1,
                container: package.container,
                items: package.items,
                used_volume_cm3: package.used_volume_cm3,
                actual_weight_gram: package.actual_weight_gram,
                volumetric_weight_gram_by_courier: volumetric,
                chargeable_weight_gram_by_courier: chargeable,
            }
        })
        .collect();

    PackagingResult {
        packages,
        chargeable_total_by_courier,
        dimension_fallback_used: units.iter().any(|unit| unit.dimension_fallback_used),
    }
}

/// `ceil(volume_cm3 * 1000 / divisor)` grams, saturating.
pub fn volumetric_weight_gram(volume_cm3: u64, divisor: u32) -> u64 {
    volume_cm3
        .saturating_mul(1000)
        .div_ceil(u64::from(divisor.max(1)))
}

fn effective_divisors(divisors: &VolumetricDivisors) -> VolumetricDivisors {
    if divisors.is_empty() {
        return VolumetricDivisors::from([(
            DEFAULT_DIVISOR_KEY.to_string(),
            DEFAULT_VOLUMETRIC_DIVISOR,
        )]);
    }
    divisors.clone()
}

fn expand_units(items: &[CartLine], fallback: Dimensions) -> Vec<PackingUnit> {
    let fallback = fallback.clamped();
    let mut units = Vec::new();
    for item in items {
        let declared = item.dimensions();
        let dimensions = declared.unwrap_or(fallback).clamped();
        let volume_cm3 = dimensions.volume_cm3();
        let weight_gram = u64::from(item.unit_weight_gram.max(1));
        for _ in 0..item.quantity {
            units.push(PackingUnit {
                product_id: item.product_id,
                weight_gram,
                dimensions,
                volume_cm3,
                dimension_fallback_used: declared.is_none(),
            });
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divisors() -> VolumetricDivisors {
        VolumetricDivisors::from([("jne".to_string(), 6000), ("anteraja".to_string(), 5000)])
    }

    #[test]
    fn small_items_share_the_smallest_fitting_box() {
        let items = vec![CartLine::new(1, 4, 500).with_dimensions(10, 10, 5)];
        let result =
            optimize_packaging(&items, &BoxPreset::builtin(), &divisors(), Dimensions::default());

        assert_eq!(result.packages.len(), 1);
        let package = &result.packages[0];
        assert_eq!(package.container.id, "small");
        assert_eq!(package.items[0].quantity, 4);
        assert_eq!(package.used_volume_cm3, 2000);
        assert_eq!(package.volumetric_weight_gram_by_courier["jne"], 334);
        assert_eq!(package.volumetric_weight_gram_by_courier["anteraja"], 400);
        assert_eq!(package.chargeable_weight_gram_by_courier["jne"], 2000);
        assert!(!result.dimension_fallback_used);
    }

    #[test]
    fn weight_ceiling_opens_additional_packages() {
        let items = vec![CartLine::new(9, 3, 2_000).with_dimensions(5, 5, 5)];
        let presets = vec![BoxPreset::new("tiny", "Tiny", Dimensions::new(30, 30, 30), 4_000)];
        let result = optimize_packaging(&items, &presets, &divisors(), Dimensions::default());

        assert_eq!(result.packages.len(), 2);
        assert_eq!(result.packages[0].package_no, 1);
        assert_eq!(result.packages[0].items[0].quantity, 2);
        assert_eq!(result.packages[1].package_no, 2);
        assert_eq!(result.chargeable_total_by_courier["jne"], 6_000);
    }

    #[test]
    fn oversized_unit_gets_custom_box() {
        let items = vec![CartLine::new(77, 1, 60_000).with_dimensions(50, 50, 50)];
        let result =
            optimize_packaging(&items, &BoxPreset::builtin(), &divisors(), Dimensions::default());

        let container = &result.packages[0].container;
        assert_eq!(container.id, "custom-77");
        assert_eq!(container.name, "Custom package");
        assert_eq!(container.max_weight_gram, 60_000);
        assert_eq!(container.volume_cm3, 125_000);
    }

    #[test]
    fn missing_dimensions_use_fallback_and_default_divisor() {
        let items = vec![CartLine::new(3, 1, 100)];
        let result = optimize_packaging(
            &items,
            &BoxPreset::builtin(),
            &VolumetricDivisors::new(),
            Dimensions::default(),
        );

        assert!(result.dimension_fallback_used);
        assert!(result.packages[0].items[0].dimension_fallback_used);
        assert_eq!(result.packages[0].used_volume_cm3, 1000);
        assert_eq!(result.chargeable_total_by_courier.len(), 1);
        assert_eq!(result.chargeable_total_by_courier["default"], 167);
        assert_eq!(result.chargeable_total_for("jne"), Some(167));
    }

    #[test]
    fn volumetric_weight_rounds_up() {
        assert_eq!(volumetric_weight_gram(4_000, 6_000), 667);
        assert_eq!(volumetric_weight_gram(6_000, 6_000), 1_000);
        assert_eq!(volumetric_weight_gram(1, 0), 1_000);
        assert_eq!(volumetric_weight_gram(u64::MAX, 6_000), u64::MAX / 6_000 + 1);
    }

    #[test]
    fn huge_unit_saturates_instead_of_overflowing() {
        let edge = 3_000_000;
        let items = vec![CartLine::new(1, 1, 500).with_dimensions(edge, edge, edge)];
        let result =
            optimize_packaging(&items, &BoxPreset::builtin(), &divisors(), Dimensions::default());

        let package = &result.packages[0];
        assert_eq!(package.container.id, "custom-1");
        assert_eq!(package.used_volume_cm3, u64::MAX);
        assert_eq!(package.chargeable_weight_gram_by_courier["jne"], u64::MAX / 6_000 + 1);
    }
}
