use std::io::Read;

use serde::de::DeserializeOwned;

use super::{ActualCostRecord, OrderShipping};

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn parse_rows<R: Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>, csv::Error> {
    csv_reader(reader).deserialize::<T>().collect()
}

/// Courier invoice rows of
/// `order_id,courier,service,area,actual_cost,source_reference`.
pub(crate) fn parse_actual_costs<R: Read>(reader: R) -> Result<Vec<ActualCostRecord>, csv::Error> {
    parse_rows(reader)
}

/// Checkout selections of
/// `order_id,courier,service,area,active_rule,estimated_cost,shipping_total`.
pub(crate) fn parse_order_ledger<R: Read>(reader: R) -> Result<Vec<OrderShipping>, csv::Error> {
    parse_rows(reader)
}
