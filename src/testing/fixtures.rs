//! Pre-built receipt sets for common scenarios.

use super::builders::ReceiptBuilder;
use crate::model::{LineItem, Receipt, ReceiptStatus};

/// Three receipts with hand-computed statistics.
///
/// | id | lines                                   | total |
/// |----|-----------------------------------------|-------|
/// | r1 | widget 2 × 10.0, gadget 1 × 5.0         | 25.0  |
/// | r2 | widget 3 × 10.0                         | 30.0  |
/// | r3 | watch 1 × 100.0                         | 100.0 |
///
/// Revenue 155.0, average 51.666…, min 25.0, max 100.0. `widget` leads
/// the quantity ranking with 5 units.
///
/// ```
/// use receiptflow::testing::three_receipt_scenario;
///
/// assert_eq!(three_receipt_scenario().len(), 3);
/// ```
#[must_use]
pub fn three_receipt_scenario() -> Vec<Receipt> {
    vec![
        ReceiptBuilder::new("r1")
            .customer("Ada", "Byron")
            .city("Springfield", "IL")
            .month(1)
            .item("widget", 2, 10.0)
            .item("gadget", 1, 5.0)
            .build(),
        ReceiptBuilder::new("r2")
            .customer("Alan", "Turing")
            .city("Portland", "OR")
            .status(ReceiptStatus::Paid)
            .month(2)
            .item("widget", 3, 10.0)
            .build(),
        ReceiptBuilder::new("r3")
            .customer("Grace", "Hopper")
            .city("Springfield", "IL")
            .status(ReceiptStatus::Delivered)
            .month(2)
            .loyalty(100)
            .item("watch", 1, 100.0)
            .build(),
    ]
}

/// Receipts the aggregation must tolerate: no lines at all, only invalid
/// lines, and one valid receipt (`ok`, total 8.0) carrying two invalid lines.
#[must_use]
pub fn malformed_receipts() -> Vec<Receipt> {
    let mut mixed = ReceiptBuilder::new("ok").item("tea", 2, 4.0).build();
    mixed.items.push(LineItem::new("ghost", 0, 3.0));
    mixed.items.push(LineItem::new("refund", 1, -3.0));
    vec![
        ReceiptBuilder::new("no-lines").build(),
        ReceiptBuilder::new("zero-qty").item("air", 0, 1.0).build(),
        ReceiptBuilder::new("nan-price").item("air", 1, f64::NAN).build(),
        mixed,
    ]
}

/// A dozen receipts spread across statuses, months, cities and price tiers.
#[must_use]
pub fn sample_receipts() -> Vec<Receipt> {
    let cities = [("Austin", "TX"), ("Denver", "CO"), ("Austin", "TX"), ("Boston", "MA")];
    let customers = [("Ada", "Byron"), ("Alan", "Turing"), ("Edsger", "Dijkstra")];
    let lines = [
        ("notebook", 3, 4.5),
        ("headphones", 1, 149.0),
        ("monitor", 2, 320.0),
        ("cable", 4, 9.99),
        ("keyboard", 1, 79.0),
        ("notebook", 1, 4.5),
    ];

    (0..12)
        .map(|i| {
            let (city, state) = cities[i % cities.len()];
            let (first, last) = customers[i % customers.len()];
            let (name, qty, price) = lines[i % lines.len()];
            let month = u32::try_from(i % 12).unwrap_or(0) + 1;
            ReceiptBuilder::new(format!("s{i:02}"))
                .customer(first, last)
                .city(city, state)
                .status(ReceiptStatus::ALL[i % ReceiptStatus::ALL.len()])
                .month(month)
                .loyalty(u32::try_from(i).unwrap_or(0) * 10)
                .item(name, qty, price)
                .item("sticker", 1, 0.5)
                .build()
        })
        .collect()
}
