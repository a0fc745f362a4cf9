//! The partial aggregate every engine builds and merges.
//!
//! A [`ReceiptAccumulator`] is owned by exactly one task at a time. Engines
//! create it empty, feed it receipts through [`absorb`](ReceiptAccumulator::absorb),
//! fold sibling accumulators in with [`merge`](ReceiptAccumulator::merge) and
//! consume it once with [`finalize`](ReceiptAccumulator::finalize).
//!
//! `merge` is associative and commutative up to floating-point rounding:
//! merging any partition of a record set, in any order, yields the same
//! counts and keys and sums equal within a relative `1e-9`.

use crate::model::{PriceTier, Receipt, ReceiptStatus};
use crate::ranking;
use crate::statistics::{ReceiptStatistics, Tally, TotalAverage};
use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Units of one item name a single receipt must contain for that receipt to
/// count towards the item's multi-unit average.
pub const MULTI_UNIT_THRESHOLD: u64 = 2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReceiptAccumulator {
    receipt_count: u64,
    total_revenue: f64,
    min_receipt: Option<f64>,
    max_receipt: Option<f64>,
    total_items_sold: u64,
    total_loyalty_points: u64,

    by_status: HashMap<ReceiptStatus, Tally>,
    by_month: HashMap<u32, Tally>,
    by_customer: HashMap<String, Tally>,
    by_item: HashMap<String, Tally>,
    by_city: HashMap<String, Tally>,
    by_state: HashMap<String, Tally>,
    by_price_tier: HashMap<PriceTier, Tally>,
    // receipt totals and receipt counts, for receipts with >= MULTI_UNIT_THRESHOLD units
    multi_unit: HashMap<String, Tally>,
}

fn bump_str(map: &mut HashMap<String, Tally>, key: &str, amount: f64, count: u64) {
    if let Some(t) = map.get_mut(key) {
        t.add(amount, count);
    } else {
        map.insert(key.to_owned(), Tally::new(amount, count));
    }
}

fn merge_tallies<K: Eq + Hash>(into: &mut HashMap<K, Tally>, from: HashMap<K, Tally>) {
    if into.is_empty() {
        *into = from;
        return;
    }
    for (k, t) in from {
        into.entry(k).or_default().merge(t);
    }
}

fn sorted<K: Ord, V>(map: HashMap<K, V>) -> BTreeMap<K, V> {
    map.into_iter().collect()
}

impl ReceiptAccumulator {
    /// A new accumulator with zeroed tallies and empty maps.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Receipts absorbed so far, including those merged in.
    #[must_use]
    pub const fn receipt_count(&self) -> u64 {
        self.receipt_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.receipt_count == 0
    }

    /// Fold one receipt into every tally in a single pass over its lines.
    ///
    /// Receipts without a single valid line item are skipped entirely, and
    /// invalid lines of an otherwise valid receipt are ignored. This never
    /// fails.
    pub fn absorb(&mut self, receipt: &Receipt) {
        if !receipt.is_aggregatable() {
            trace!("skipping receipt {} without valid line items", receipt.id);
            return;
        }

        let mut order_total = 0.0;
        let mut units_in_order = 0u64;
        let mut units_by_name: HashMap<&str, u64> = HashMap::new();

        for item in receipt.valid_items() {
            let revenue = item.revenue();
            let units = u64::from(item.quantity);
            order_total += revenue;
            units_in_order += units;

            bump_str(&mut self.by_item, &item.name, revenue, units);
            self.by_price_tier
                .entry(item.price_tier())
                .or_default()
                .add(revenue, units);
            *units_by_name.entry(item.name.as_str()).or_insert(0) += units;
        }

        for (name, units) in units_by_name {
            if units >= MULTI_UNIT_THRESHOLD {
                bump_str(&mut self.multi_unit, name, order_total, 1);
            }
        }

        self.receipt_count += 1;
        self.total_revenue += order_total;
        self.min_receipt = Some(self.min_receipt.map_or(order_total, |m| m.min(order_total)));
        self.max_receipt = Some(self.max_receipt.map_or(order_total, |m| m.max(order_total)));
        self.total_items_sold += units_in_order;
        self.total_loyalty_points += u64::from(receipt.loyalty_points_earned);

        self.by_status
            .entry(receipt.status)
            .or_default()
            .add(order_total, 1);
        self.by_month
            .entry(receipt.month())
            .or_default()
            .add(order_total, 1);
        bump_str(&mut self.by_customer, &receipt.customer.key(), order_total, 1);
        bump_str(&mut self.by_city, &receipt.shipping_address.city, order_total, 1);
        bump_str(&mut self.by_state, &receipt.shipping_address.state, order_total, 1);
    }

    /// Combine `other` into `self`, taking ownership of its maps.
    pub fn merge(&mut self, other: ReceiptAccumulator) {
        self.receipt_count += other.receipt_count;
        self.total_revenue += other.total_revenue;
        self.min_receipt = match (self.min_receipt, other.min_receipt) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_receipt = match (self.max_receipt, other.max_receipt) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.total_items_sold += other.total_items_sold;
        self.total_loyalty_points += other.total_loyalty_points;

        merge_tallies(&mut self.by_status, other.by_status);
        merge_tallies(&mut self.by_month, other.by_month);
        merge_tallies(&mut self.by_customer, other.by_customer);
        merge_tallies(&mut self.by_item, other.by_item);
        merge_tallies(&mut self.by_city, other.by_city);
        merge_tallies(&mut self.by_state, other.by_state);
        merge_tallies(&mut self.by_price_tier, other.by_price_tier);
        merge_tallies(&mut self.multi_unit, other.multi_unit);
    }

    /// Builder-style [`merge`](Self::merge), handy in reductions.
    #[must_use]
    pub fn merged(mut self, other: ReceiptAccumulator) -> Self {
        self.merge(other);
        self
    }

    /// Finalize with the default top-N limit.
    #[must_use]
    pub fn finalize(self) -> ReceiptStatistics {
        self.finalize_top(ranking::DEFAULT_TOP_LIMIT)
    }

    /// Consume the accumulator and derive the immutable statistics, keeping
    /// `top_n` entries in every bounded ranking.
    #[must_use]
    pub fn finalize_top(self, top_n: usize) -> ReceiptStatistics {
        let totals = Tally::new(self.total_revenue, self.receipt_count);
        let item_average_receipts = ranking::item_average_receipts(&self.multi_unit);

        let mut stats = ReceiptStatistics {
            total_orders: self.receipt_count,
            total_revenue: self.total_revenue,
            average_receipt_amount: totals.mean(),
            total_average: TotalAverage::from_tally(totals),
            min_receipt_amount: self.min_receipt.unwrap_or(0.0),
            max_receipt_amount: self.max_receipt.unwrap_or(0.0),
            total_items_sold: self.total_items_sold,
            unique_customers: self.by_customer.len() as u64,
            total_loyalty_points: self.total_loyalty_points,
            by_status: sorted(self.by_status),
            by_month: sorted(self.by_month),
            by_customer: sorted(self.by_customer),
            by_item: sorted(self.by_item),
            by_city: sorted(self.by_city),
            by_state: sorted(self.by_state),
            by_price_tier: sorted(self.by_price_tier),
            item_average_receipts,
            ..ReceiptStatistics::default()
        };

        stats.top_customers_by_spending = ranking::top_customers_by_spending(&stats.by_customer, top_n);
        stats.top_customers_by_order_count =
            ranking::top_customers_by_order_count(&stats.by_customer, top_n);
        stats.top_items_by_quantity = ranking::top_items_by_quantity(&stats.by_item, top_n);
        stats.top_cities_by_revenue = ranking::top_cities_by_revenue(&stats.by_city, top_n);
        stats.top_states_by_revenue = ranking::top_states_by_revenue(&stats.by_state, top_n);
        stats.revenue_by_status_ranking = ranking::revenue_by_status(&stats.by_status);
        stats.sales_by_price_tier = ranking::sales_by_price_tier(&stats.by_price_tier);
        stats
    }
}

impl<'a> Extend<&'a Receipt> for ReceiptAccumulator {
    fn extend<I: IntoIterator<Item = &'a Receipt>>(&mut self, iter: I) {
        for receipt in iter {
            self.absorb(receipt);
        }
    }
}

impl<'a> FromIterator<&'a Receipt> for ReceiptAccumulator {
    fn from_iter<I: IntoIterator<Item = &'a Receipt>>(iter: I) -> Self {
        let mut acc = Self::empty();
        acc.extend(iter);
        acc
    }
}
