use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::{CartLine, OriginMap, OriginMapping, Shipment, Warehouse, WarehouseId};

/// Score carried by a plan that cannot be fulfilled.
pub const UNAVAILABLE_SCORE: u64 = u64::MAX;

/// A candidate fulfillment plan. Lower scores are preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCandidate {
    pub is_available: bool,
    pub shipments: Vec<Shipment>,
    pub score: u64,
}

impl PlanCandidate {
    pub fn unavailable() -> Self {
        Self {
            is_available: false,
            shipments: Vec::new(),
            score: UNAVAILABLE_SCORE,
        }
    }

    fn available(shipments: Vec<Shipment>, score: u64) -> Self {
        Self {
            is_available: true,
            shipments,
            score,
        }
    }

    pub fn shipment_count(&self) -> usize {
        self.shipments.len()
    }
}

/// Both plans computed for one cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPlans {
    pub single_origin: PlanCandidate,
    pub split_shipment: PlanCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    SingleOrigin,
    SplitShipment,
}

impl PlanKind {
    pub const fn label(self) -> &'static str {
        match self {
            PlanKind::SingleOrigin => "single_origin",
            PlanKind::SplitShipment => "split_shipment",
        }
    }
}

/// Store-level preference used to pick between the two plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStrategy {
    /// Lowest score wins.
    #[default]
    Balanced,
    /// Fewest shipments wins; score breaks ties.
    FewestShipments,
}

impl ShipmentStrategy {
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "fewest_shipments" | "fewest-shipments" | "fewest" => Self::FewestShipments,
            _ => Self::Balanced,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ShipmentStrategy::Balanced => "balanced",
            ShipmentStrategy::FewestShipments => "fewest_shipments",
        }
    }
}

impl ShipmentPlans {
    /// Pick the plan to quote. Ties go to the single-origin plan; `None` when
    /// neither plan can fulfill the cart.
    pub fn select(&self, strategy: ShipmentStrategy) -> Option<(PlanKind, &PlanCandidate)> {
        let single = (PlanKind::SingleOrigin, &self.single_origin);
        let split = (PlanKind::SplitShipment, &self.split_shipment);

        match (self.single_origin.is_available, self.split_shipment.is_available) {
            (false, false) => None,
            (true, false) => Some(single),
            (false, true) => Some(split),
            (true, true) => {
                let rank = |plan: &PlanCandidate| match strategy {
                    ShipmentStrategy::Balanced => (plan.score, 0),
                    ShipmentStrategy::FewestShipments => {
                        (plan.shipment_count() as u64, plan.score)
                    }
                };
                if rank(&self.split_shipment) < rank(&self.single_origin) {
                    Some(split)
                } else {
                    Some(single)
                }
            }
        }
    }
}

/// Compute the single-origin and split-shipment plans for a cart.
///
/// The single-origin winner is the first warehouse, in ascending order of
/// summed mapping priority, holding enough stock for every line. The split
/// plan allocates each line greedily across its mappings and is unavailable
/// as a whole when any line cannot be covered.
pub fn plan_shipments(
    lines: &[CartLine],
    origin_map: &OriginMap,
    warehouses: &[Warehouse],
) -> ShipmentPlans {
    let index: HashMap<WarehouseId, &Warehouse> = warehouses
        .iter()
        .map(|warehouse| (warehouse.id, warehouse))
        .collect();

    ShipmentPlans {
        single_origin: single_origin_plan(lines, origin_map, &index),
        split_shipment: split_shipment_plan(lines, origin_map, &index),
    }
}

fn mappings_for<'a>(origin_map: &'a OriginMap, line: &CartLine) -> &'a [OriginMapping] {
    origin_map
        .get(&line.product_id)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn single_origin_plan(
    lines: &[CartLine],
    origin_map: &OriginMap,
    index: &HashMap<WarehouseId, &Warehouse>,
) -> PlanCandidate {
    if lines.is_empty() {
        return PlanCandidate::available(Vec::new(), 0);
    }

    let mut candidates: Vec<(WarehouseId, u64)> = Vec::new();
    for line in lines {
        for mapping in mappings_for(origin_map, line) {
            let priority = u64::from(mapping.priority);
            match candidates
                .iter_mut()
                .find(|(warehouse_id, _)| *warehouse_id == mapping.warehouse_id)
            {
                Some((_, score)) => *score = score.saturating_add(priority),
                None => candidates.push((mapping.warehouse_id, priority)),
            }
        }
    }

    // Stable: equal scores keep first-seen order.
    candidates.sort_by_key(|(_, score)| *score);

    for (warehouse_id, score) in candidates {
        if !can_fulfill(warehouse_id, lines, origin_map) {
            continue;
        }

        let mut shipment = Shipment::new(&resolve_warehouse(index, warehouse_id));
        for line in lines {
            shipment.push_item(line.clone());
        }
        return PlanCandidate::available(vec![shipment], score);
    }

    PlanCandidate::unavailable()
}

fn can_fulfill(warehouse_id: WarehouseId, lines: &[CartLine], origin_map: &OriginMap) -> bool {
    lines.iter().all(|line| {
        mappings_for(origin_map, line).iter().any(|mapping| {
            mapping.warehouse_id == warehouse_id && mapping.stock_qty >= line.quantity
        })
    })
}

fn split_shipment_plan(
    lines: &[CartLine],
    origin_map: &OriginMap,
    index: &HashMap<WarehouseId, &Warehouse>,
) -> PlanCandidate {
    let mut shipments: Vec<Shipment> = Vec::new();
    let mut score: u64 = 0;

    for line in lines {
        let mut mappings: Vec<&OriginMapping> = mappings_for(origin_map, line).iter().collect();
        mappings.sort_by_key(|mapping| (mapping.is_fallback, mapping.priority));

        let mut remaining = line.quantity;
        for mapping in mappings {
            if remaining == 0 {
                break;
            }
            if mapping.stock_qty == 0 {
                continue;
            }

            let allocated = remaining.min(mapping.stock_qty);
            let position = match shipments
                .iter()
                .position(|shipment| shipment.warehouse_id == mapping.warehouse_id)
            {
                Some(position) => position,
                None => {
                    shipments.push(Shipment::new(&resolve_warehouse(
                        index,
                        mapping.warehouse_id,
                    )));
                    shipments.len() - 1
                }
            };

            shipments[position].push_item(CartLine {
                quantity: allocated,
                ..line.clone()
            });
            score = score.saturating_add(u64::from(mapping.priority) * u64::from(allocated));
            remaining -= allocated;
        }

        if remaining > 0 {
            return PlanCandidate::unavailable();
        }
    }

    PlanCandidate::available(shipments, score)
}

fn resolve_warehouse(index: &HashMap<WarehouseId, &Warehouse>, id: WarehouseId) -> Warehouse {
    index
        .get(&id)
        .map(|warehouse| (*warehouse).clone())
        .unwrap_or_else(|| Warehouse::placeholder(id))
}
