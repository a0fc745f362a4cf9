//! Ranking and derived ratio metrics.
//!
//! Every function here is pure: it reads merged per-key tallies and returns a
//! freshly sorted list. Orderings are strict total orders (metric descending,
//! secondary metric descending, natural key ascending), so the output is the
//! same no matter how the tallies were produced or in which order the map was
//! iterated.

use crate::model::{PriceTier, ReceiptStatus};
use crate::statistics::{
    CityRevenue, CustomerOrderProfile, CustomerSpending, ItemAverageReceipt, ItemSales,
    PriceTierSales, StateRevenue, StatusRevenue, Tally,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Default length of every top-N list.
pub const DEFAULT_TOP_LIMIT: usize = 5;

/// Minimum number of qualifying receipts, after merge, for an item to appear
/// in the multi-unit average receipt list.
pub const MULTI_UNIT_MIN_RECEIPTS: u64 = 1;

/// Sort `entries` by `cmp` and keep the first `limit` (all when `None`).
///
/// For a bounded limit the top slice is partitioned out first so only the
/// survivors are fully sorted.
fn rank<T>(mut entries: Vec<T>, limit: Option<usize>, cmp: fn(&T, &T) -> Ordering) -> Vec<T> {
    if let Some(limit) = limit {
        if limit == 0 {
            return Vec::new();
        }
        if limit < entries.len() {
            entries.select_nth_unstable_by(limit - 1, cmp);
            entries.truncate(limit);
        }
    }
    entries.sort_by(cmp);
    entries
}

#[must_use]
pub fn top_customers_by_spending(
    by_customer: &BTreeMap<String, Tally>,
    limit: usize,
) -> Vec<CustomerSpending> {
    let entries = by_customer
        .iter()
        .map(|(name, t)| CustomerSpending {
            customer_name: name.clone(),
            total_spent: t.amount,
        })
        .collect();
    rank(entries, Some(limit), CustomerSpending::by_total_spent_desc)
}

#[must_use]
pub fn top_customers_by_order_count(
    by_customer: &BTreeMap<String, Tally>,
    limit: usize,
) -> Vec<CustomerOrderProfile> {
    let entries = by_customer
        .iter()
        .map(|(name, t)| CustomerOrderProfile {
            customer_name: name.clone(),
            orders_count: t.count,
            total_spent: t.amount,
            average_order_value: t.mean(),
        })
        .collect();
    rank(entries, Some(limit), CustomerOrderProfile::by_orders_desc)
}

#[must_use]
pub fn top_items_by_quantity(by_item: &BTreeMap<String, Tally>, limit: usize) -> Vec<ItemSales> {
    let entries = by_item
        .iter()
        .map(|(name, t)| ItemSales {
            item_name: name.clone(),
            quantity_sold: t.count,
            total_revenue: t.amount,
        })
        .collect();
    rank(entries, Some(limit), ItemSales::by_quantity_desc)
}

#[must_use]
pub fn top_cities_by_revenue(by_city: &BTreeMap<String, Tally>, limit: usize) -> Vec<CityRevenue> {
    let entries = by_city
        .iter()
        .map(|(city, t)| CityRevenue {
            city: city.clone(),
            total_revenue: t.amount,
            orders_count: t.count,
        })
        .collect();
    rank(entries, Some(limit), CityRevenue::by_revenue_desc)
}

#[must_use]
pub fn top_states_by_revenue(
    by_state: &BTreeMap<String, Tally>,
    limit: usize,
) -> Vec<StateRevenue> {
    let entries = by_state
        .iter()
        .map(|(state, t)| StateRevenue {
            state: state.clone(),
            total_revenue: t.amount,
            orders_count: t.count,
        })
        .collect();
    rank(entries, Some(limit), StateRevenue::by_revenue_desc)
}

/// Every status that saw at least one order, best first.
#[must_use]
pub fn revenue_by_status(by_status: &BTreeMap<ReceiptStatus, Tally>) -> Vec<StatusRevenue> {
    let entries = by_status
        .iter()
        .map(|(status, t)| StatusRevenue {
            status: *status,
            total_revenue: t.amount,
            orders_count: t.count,
            average_order_value: t.mean(),
        })
        .collect();
    rank(entries, None, StatusRevenue::by_revenue_desc)
}

/// Every tier that sold something, best first.
#[must_use]
pub fn sales_by_price_tier(by_tier: &BTreeMap<PriceTier, Tally>) -> Vec<PriceTierSales> {
    let entries = PriceTier::ALL
        .into_iter()
        .map(|tier| {
            let t = by_tier.get(&tier).copied().unwrap_or_default();
            PriceTierSales {
                price_tier: tier,
                items_sold: t.count,
                total_revenue: t.amount,
                average_unit_price: t.mean(),
            }
        })
        .filter(|sales| sales.items_sold > 0 || sales.total_revenue > 0.0)
        .collect();
    rank(entries, None, PriceTierSales::by_revenue_desc)
}

/// Average receipt total for every item bought at least twice within a
/// receipt, across at least [`MULTI_UNIT_MIN_RECEIPTS`] receipts.
#[must_use]
pub fn item_average_receipts<'a, I>(multi_unit: I) -> Vec<ItemAverageReceipt>
where
    I: IntoIterator<Item = (&'a String, &'a Tally)>,
{
    let entries = multi_unit
        .into_iter()
        .filter(|(_, t)| t.count >= MULTI_UNIT_MIN_RECEIPTS)
        .map(|(name, t)| ItemAverageReceipt {
            item_name: name.clone(),
            receipt_count: t.count,
            average_receipt_amount: t.mean(),
        })
        .collect();
    rank(entries, None, ItemAverageReceipt::by_average_desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tallies(pairs: &[(&str, f64, u64)]) -> BTreeMap<String, Tally> {
        pairs
            .iter()
            .map(|(k, a, c)| ((*k).to_string(), Tally::new(*a, *c)))
            .collect()
    }

    #[test]
    fn rank_handles_limits_at_and_past_len() {
        let v = vec![3, 1, 2];
        assert_eq!(rank(v.clone(), Some(0), |a: &i32, b| b.cmp(a)), Vec::<i32>::new());
        assert_eq!(rank(v.clone(), Some(2), |a: &i32, b| b.cmp(a)), vec![3, 2]);
        assert_eq!(rank(v.clone(), Some(10), |a: &i32, b| b.cmp(a)), vec![3, 2, 1]);
        assert_eq!(rank(v, None, |a: &i32, b| a.cmp(b)), vec![1, 2, 3]);
    }

    #[test]
    fn spending_ties_break_by_name() {
        let m = tallies(&[("zed", 10.0, 1), ("amy", 10.0, 3), ("bob", 20.0, 1)]);
        let top = top_customers_by_spending(&m, 5);
        let names: Vec<_> = top.iter().map(|c| c.customer_name.as_str()).collect();
        assert_eq!(names, ["bob", "amy", "zed"]);
    }

    #[test]
    fn order_count_ties_break_by_spend_then_name() {
        let m = tallies(&[("c", 30.0, 2), ("b", 50.0, 2), ("a", 30.0, 2), ("d", 1.0, 5)]);
        let top = top_customers_by_order_count(&m, 3);
        let names: Vec<_> = top.iter().map(|c| c.customer_name.as_str()).collect();
        assert_eq!(names, ["d", "b", "a"]);
        assert!((top[1].average_order_value - 25.0).abs() < 1e-12);
    }

    #[test]
    fn price_tiers_without_sales_are_omitted() {
        let mut m = BTreeMap::new();
        m.insert(PriceTier::Premium, Tally::new(300.0, 2));
        m.insert(PriceTier::Budget, Tally::new(15.0, 3));
        let sales = sales_by_price_tier(&m);
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].price_tier, PriceTier::Premium);
        assert!((sales[1].average_unit_price - 5.0).abs() < 1e-12);
    }
}
