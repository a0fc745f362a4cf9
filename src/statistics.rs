//! Finalized statistics and the ranked entry types they carry.
//!
//! A [`ReceiptStatistics`] value is produced exactly once per engine run by
//! [`ReceiptAccumulator::finalize`](crate::ReceiptAccumulator::finalize) and is
//! never mutated afterwards. It derives `Serialize` so report renderers and
//! exporters outside this crate can consume it directly.

use crate::model::{PriceTier, ReceiptStatus};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A running `(amount, count)` pair for one key.
///
/// What `amount` and `count` mean depends on the breakdown: revenue and
/// orders for statuses, cities and customers; revenue and units for items and
/// price tiers; summed receipt totals and receipts for multi-unit items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub amount: f64,
    pub count: u64,
}

impl Tally {
    #[must_use]
    pub const fn new(amount: f64, count: u64) -> Self {
        Self { amount, count }
    }

    pub fn add(&mut self, amount: f64, count: u64) {
        self.amount += amount;
        self.count += count;
    }

    pub fn merge(&mut self, other: Tally) {
        self.add(other.amount, other.count);
    }

    /// `amount / count`, or `0.0` for an empty tally.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.amount / self.count as f64
        }
    }
}

/// Receipt count, revenue and average in one record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalAverage {
    pub receipt_count: u64,
    pub total_revenue: f64,
    pub average_receipt_amount: f64,
}

impl TotalAverage {
    #[must_use]
    pub fn from_tally(tally: Tally) -> Self {
        Self {
            receipt_count: tally.count,
            total_revenue: tally.amount,
            average_receipt_amount: tally.mean(),
        }
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    OrderedFloat(b).cmp(&OrderedFloat(a))
}

/// How much a customer has spent in total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerSpending {
    pub customer_name: String,
    pub total_spent: f64,
}

impl CustomerSpending {
    /// Total spent descending, then name ascending.
    #[must_use]
    pub fn by_total_spent_desc(a: &Self, b: &Self) -> Ordering {
        desc(a.total_spent, b.total_spent).then_with(|| a.customer_name.cmp(&b.customer_name))
    }
}

/// How often a customer orders and how much they spend per order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrderProfile {
    pub customer_name: String,
    pub orders_count: u64,
    pub total_spent: f64,
    pub average_order_value: f64,
}

impl CustomerOrderProfile {
    /// Orders descending, total spent descending, then name ascending.
    #[must_use]
    pub fn by_orders_desc(a: &Self, b: &Self) -> Ordering {
        b.orders_count
            .cmp(&a.orders_count)
            .then_with(|| desc(a.total_spent, b.total_spent))
            .then_with(|| a.customer_name.cmp(&b.customer_name))
    }
}

/// Units and revenue sold for one item name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSales {
    pub item_name: String,
    pub quantity_sold: u64,
    pub total_revenue: f64,
}

impl ItemSales {
    /// Quantity descending, revenue descending, then name ascending.
    #[must_use]
    pub fn by_quantity_desc(a: &Self, b: &Self) -> Ordering {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| desc(a.total_revenue, b.total_revenue))
            .then_with(|| a.item_name.cmp(&b.item_name))
    }
}

/// Average receipt total among receipts that bought an item at least twice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemAverageReceipt {
    pub item_name: String,
    pub receipt_count: u64,
    pub average_receipt_amount: f64,
}

impl ItemAverageReceipt {
    /// Average descending, receipt count descending, then name ascending.
    #[must_use]
    pub fn by_average_desc(a: &Self, b: &Self) -> Ordering {
        desc(a.average_receipt_amount, b.average_receipt_amount)
            .then_with(|| b.receipt_count.cmp(&a.receipt_count))
            .then_with(|| a.item_name.cmp(&b.item_name))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CityRevenue {
    pub city: String,
    pub total_revenue: f64,
    pub orders_count: u64,
}

impl CityRevenue {
    /// Revenue descending, orders descending, then city ascending.
    #[must_use]
    pub fn by_revenue_desc(a: &Self, b: &Self) -> Ordering {
        desc(a.total_revenue, b.total_revenue)
            .then_with(|| b.orders_count.cmp(&a.orders_count))
            .then_with(|| a.city.cmp(&b.city))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRevenue {
    pub state: String,
    pub total_revenue: f64,
    pub orders_count: u64,
}

impl StateRevenue {
    /// Revenue descending, orders descending, then state ascending.
    #[must_use]
    pub fn by_revenue_desc(a: &Self, b: &Self) -> Ordering {
        desc(a.total_revenue, b.total_revenue)
            .then_with(|| b.orders_count.cmp(&a.orders_count))
            .then_with(|| a.state.cmp(&b.state))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusRevenue {
    pub status: ReceiptStatus,
    pub total_revenue: f64,
    pub orders_count: u64,
    pub average_order_value: f64,
}

impl StatusRevenue {
    /// Revenue descending, orders descending, then declaration order.
    #[must_use]
    pub fn by_revenue_desc(a: &Self, b: &Self) -> Ordering {
        desc(a.total_revenue, b.total_revenue)
            .then_with(|| b.orders_count.cmp(&a.orders_count))
            .then_with(|| a.status.cmp(&b.status))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceTierSales {
    pub price_tier: PriceTier,
    pub items_sold: u64,
    pub total_revenue: f64,
    pub average_unit_price: f64,
}

impl PriceTierSales {
    /// Revenue descending, units descending, then declaration order.
    #[must_use]
    pub fn by_revenue_desc(a: &Self, b: &Self) -> Ordering {
        desc(a.total_revenue, b.total_revenue)
            .then_with(|| b.items_sold.cmp(&a.items_sold))
            .then_with(|| a.price_tier.cmp(&b.price_tier))
    }
}

/// The immutable result of one aggregation run.
///
/// Every average is derived from merged sums and counts; on empty input all
/// scalars are `0`, every map is empty and every ranked list is empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptStatistics {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub average_receipt_amount: f64,
    pub total_average: TotalAverage,
    pub min_receipt_amount: f64,
    pub max_receipt_amount: f64,
    pub total_items_sold: u64,
    pub unique_customers: u64,
    pub total_loyalty_points: u64,

    /// Revenue and orders per status.
    pub by_status: BTreeMap<ReceiptStatus, Tally>,
    /// Revenue and orders per calendar month (`1..=12`).
    pub by_month: BTreeMap<u32, Tally>,
    /// Revenue and orders per customer key.
    pub by_customer: BTreeMap<String, Tally>,
    /// Revenue and units per item name.
    pub by_item: BTreeMap<String, Tally>,
    /// Revenue and orders per city.
    pub by_city: BTreeMap<String, Tally>,
    /// Revenue and orders per state.
    pub by_state: BTreeMap<String, Tally>,
    /// Revenue and units per price tier.
    pub by_price_tier: BTreeMap<PriceTier, Tally>,

    pub top_customers_by_spending: Vec<CustomerSpending>,
    pub top_customers_by_order_count: Vec<CustomerOrderProfile>,
    pub top_items_by_quantity: Vec<ItemSales>,
    pub item_average_receipts: Vec<ItemAverageReceipt>,
    pub top_cities_by_revenue: Vec<CityRevenue>,
    pub revenue_by_status_ranking: Vec<StatusRevenue>,
    pub sales_by_price_tier: Vec<PriceTierSales>,
    pub top_states_by_revenue: Vec<StateRevenue>,
}

impl ReceiptStatistics {
    /// Statistics of an empty record set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Revenue per calendar month, the flat view most reports want.
    #[must_use]
    pub fn revenue_by_month(&self) -> BTreeMap<u32, f64> {
        self.by_month.iter().map(|(m, t)| (*m, t.amount)).collect()
    }

    /// Orders per status.
    #[must_use]
    pub fn orders_by_status(&self) -> BTreeMap<ReceiptStatus, u64> {
        self.by_status.iter().map(|(s, t)| (*s, t.count)).collect()
    }
}
