//! Assertions for comparing aggregation outputs.
//!
//! Different engines associate floating-point additions differently, so two
//! correct runs can disagree in the last bits of a sum. These helpers compare
//! counts, keys and ranking order exactly and every floating-point value
//! within a relative tolerance.

use crate::statistics::{ReceiptStatistics, Tally};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// `|a - b| <= rel_tol * max(1, |a|, |b|)`.
///
/// ```
/// use receiptflow::testing::relative_eq;
///
/// assert!(relative_eq(0.1 + 0.2, 0.3, 1e-12));
/// assert!(!relative_eq(1.0, 1.1, 1e-3));
/// ```
#[must_use]
pub fn relative_eq(a: f64, b: f64, rel_tol: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = 1f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= rel_tol * scale
}

fn assert_close(what: &str, actual: f64, expected: f64, rel_tol: f64) {
    assert!(
        relative_eq(actual, expected, rel_tol),
        "{what} mismatch:\n  Expected: {expected}\n  Actual: {actual}\n  Relative tolerance: {rel_tol}"
    );
}

fn assert_tallies_close<K: Ord + Debug>(
    what: &str,
    actual: &BTreeMap<K, Tally>,
    expected: &BTreeMap<K, Tally>,
    rel_tol: f64,
) {
    let actual_keys: Vec<&K> = actual.keys().collect();
    let expected_keys: Vec<&K> = expected.keys().collect();
    assert_eq!(
        actual_keys, expected_keys,
        "{what} keys differ:\n  Expected: {expected_keys:?}\n  Actual: {actual_keys:?}"
    );
    for ((key, a), e) in actual.iter().zip(expected.values()) {
        assert_eq!(a.count, e.count, "{what}[{key:?}] count mismatch");
        assert_close(&format!("{what}[{key:?}] amount"), a.amount, e.amount, rel_tol);
    }
}

/// Entry identity, exact-compared integers, tolerance-compared floats.
type Shape = (String, Vec<u64>, Vec<f64>);

fn assert_ranking_close<T: Debug>(
    what: &str,
    actual: &[T],
    expected: &[T],
    rel_tol: f64,
    shape: impl Fn(&T) -> Shape,
) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{what} length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let (a_key, a_counts, a_amounts) = shape(a);
        let (e_key, e_counts, e_amounts) = shape(e);
        assert_eq!(a_key, e_key, "{what} order differs at rank {i}");
        assert_eq!(a_counts, e_counts, "{what}[{a_key}] counts mismatch");
        for (x, y) in a_amounts.into_iter().zip(e_amounts) {
            assert_close(&format!("{what}[{a_key}]"), x, y, rel_tol);
        }
    }
}

/// Assert two statistics agree: counts, keys and ranking order exactly,
/// floating-point values within `rel_tol` (relative, see [`relative_eq`]).
///
/// # Panics
///
/// Panics with the first differing field.
pub fn assert_statistics_close(actual: &ReceiptStatistics, expected: &ReceiptStatistics, rel_tol: f64) {
    assert_eq!(actual.total_orders, expected.total_orders, "total_orders mismatch");
    assert_eq!(actual.total_items_sold, expected.total_items_sold, "total_items_sold mismatch");
    assert_eq!(actual.unique_customers, expected.unique_customers, "unique_customers mismatch");
    assert_eq!(
        actual.total_loyalty_points, expected.total_loyalty_points,
        "total_loyalty_points mismatch"
    );
    assert_eq!(
        actual.total_average.receipt_count, expected.total_average.receipt_count,
        "total_average.receipt_count mismatch"
    );

    assert_close("total_revenue", actual.total_revenue, expected.total_revenue, rel_tol);
    assert_close(
        "average_receipt_amount",
        actual.average_receipt_amount,
        expected.average_receipt_amount,
        rel_tol,
    );
    assert_close("min_receipt_amount", actual.min_receipt_amount, expected.min_receipt_amount, rel_tol);
    assert_close("max_receipt_amount", actual.max_receipt_amount, expected.max_receipt_amount, rel_tol);
    assert_close(
        "total_average.total_revenue",
        actual.total_average.total_revenue,
        expected.total_average.total_revenue,
        rel_tol,
    );
    assert_close(
        "total_average.average_receipt_amount",
        actual.total_average.average_receipt_amount,
        expected.total_average.average_receipt_amount,
        rel_tol,
    );

    assert_tallies_close("by_status", &actual.by_status, &expected.by_status, rel_tol);
    assert_tallies_close("by_month", &actual.by_month, &expected.by_month, rel_tol);
    assert_tallies_close("by_customer", &actual.by_customer, &expected.by_customer, rel_tol);
    assert_tallies_close("by_item", &actual.by_item, &expected.by_item, rel_tol);
    assert_tallies_close("by_city", &actual.by_city, &expected.by_city, rel_tol);
    assert_tallies_close("by_state", &actual.by_state, &expected.by_state, rel_tol);
    assert_tallies_close("by_price_tier", &actual.by_price_tier, &expected.by_price_tier, rel_tol);

    assert_ranking_close(
        "top_customers_by_spending",
        &actual.top_customers_by_spending,
        &expected.top_customers_by_spending,
        rel_tol,
        |e| (e.customer_name.clone(), vec![], vec![e.total_spent]),
    );
    assert_ranking_close(
        "top_customers_by_order_count",
        &actual.top_customers_by_order_count,
        &expected.top_customers_by_order_count,
        rel_tol,
        |e| {
            (
                e.customer_name.clone(),
                vec![e.orders_count],
                vec![e.total_spent, e.average_order_value],
            )
        },
    );
    assert_ranking_close(
        "top_items_by_quantity",
        &actual.top_items_by_quantity,
        &expected.top_items_by_quantity,
        rel_tol,
        |e| (e.item_name.clone(), vec![e.quantity_sold], vec![e.total_revenue]),
    );
    assert_ranking_close(
        "item_average_receipts",
        &actual.item_average_receipts,
        &expected.item_average_receipts,
        rel_tol,
        |e| (e.item_name.clone(), vec![e.receipt_count], vec![e.average_receipt_amount]),
    );
    assert_ranking_close(
        "top_cities_by_revenue",
        &actual.top_cities_by_revenue,
        &expected.top_cities_by_revenue,
        rel_tol,
        |e| (e.city.clone(), vec![e.orders_count], vec![e.total_revenue]),
    );
    assert_ranking_close(
        "top_states_by_revenue",
        &actual.top_states_by_revenue,
        &expected.top_states_by_revenue,
        rel_tol,
        |e| (e.state.clone(), vec![e.orders_count], vec![e.total_revenue]),
    );
    assert_ranking_close(
        "revenue_by_status_ranking",
        &actual.revenue_by_status_ranking,
        &expected.revenue_by_status_ranking,
        rel_tol,
        |e| {
            (
                e.status.to_string(),
                vec![e.orders_count],
                vec![e.total_revenue, e.average_order_value],
            )
        },
    );
    assert_ranking_close(
        "sales_by_price_tier",
        &actual.sales_by_price_tier,
        &expected.sales_by_price_tier,
        rel_tol,
        |e| {
            (
                e.price_tier.to_string(),
                vec![e.items_sold],
                vec![e.total_revenue, e.average_unit_price],
            )
        },
    );
}
