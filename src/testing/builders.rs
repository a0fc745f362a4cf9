//! Receipt builders for tests and benchmarks.

use crate::model::{Customer, LineItem, Receipt, ReceiptStatus, ShippingAddress};
use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap_or_default()
}

/// A fluent builder for a single [`Receipt`].
///
/// Defaults: status `Created`, customer "Test Customer", Springfield IL,
/// 2024-01-15 10:00, no loyalty points, no lines.
///
/// # Example
///
/// ```
/// use receiptflow::testing::ReceiptBuilder;
///
/// let r = ReceiptBuilder::new("r1")
///     .customer("Ada", "Byron")
///     .item("widget", 2, 10.0)
///     .build();
/// assert_eq!(r.total(), 20.0);
/// ```
#[derive(Clone, Debug)]
pub struct ReceiptBuilder {
    receipt: Receipt,
}

impl ReceiptBuilder {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            receipt: Receipt {
                id: id.into(),
                timestamp: date_time(2024, 1, 15, 10, 0),
                status: ReceiptStatus::Created,
                customer: Customer::new("Test", "Customer"),
                shipping_address: ShippingAddress::new("Springfield", "IL"),
                loyalty_points_earned: 0,
                items: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn customer(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.receipt.customer = Customer::new(first, last);
        self
    }

    #[must_use]
    pub fn status(mut self, status: ReceiptStatus) -> Self {
        self.receipt.status = status;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.receipt.timestamp = timestamp;
        self
    }

    /// Move the receipt to the 15th of `month` (2024), 10:00.
    ///
    /// # Panics
    /// If `month` is not in `1..=12`.
    #[must_use]
    pub fn month(self, month: u32) -> Self {
        assert!((1..=12).contains(&month), "month must be in 1..=12, got {month}");
        self.timestamp(date_time(2024, month, 15, 10, 0))
    }

    #[must_use]
    pub fn city(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.receipt.shipping_address.city = city.into();
        self.receipt.shipping_address.state = state.into();
        self
    }

    #[must_use]
    pub fn loyalty(mut self, points: u32) -> Self {
        self.receipt.loyalty_points_earned = points;
        self
    }

    /// Append a line item.
    #[must_use]
    pub fn item(mut self, name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        self.receipt.items.push(LineItem::new(name, quantity, unit_price));
        self
    }

    #[must_use]
    pub fn build(self) -> Receipt {
        self.receipt
    }
}

const FIRST_NAMES: [&str; 8] = ["Ada", "Alan", "Barbara", "Donald", "Edsger", "Grace", "Ken", "Margaret"];
const LAST_NAMES: [&str; 6] = ["Byron", "Hopper", "Knuth", "Liskov", "Thompson", "Turing"];
const PLACES: [(&str, &str); 8] = [
    ("Austin", "TX"),
    ("Boston", "MA"),
    ("Chicago", "IL"),
    ("Denver", "CO"),
    ("Portland", "OR"),
    ("Seattle", "WA"),
    ("Springfield", "IL"),
    ("Houston", "TX"),
];
const CATALOG: [(&str, f64, f64); 10] = [
    ("sticker", 0.5, 3.0),
    ("notebook", 2.0, 15.0),
    ("cable", 5.0, 25.0),
    ("mouse", 15.0, 60.0),
    ("keyboard", 30.0, 180.0),
    ("headphones", 60.0, 300.0),
    ("monitor", 150.0, 600.0),
    ("chair", 90.0, 450.0),
    ("desk", 200.0, 900.0),
    ("laptop", 600.0, 2_500.0),
];

/// Reproducible random receipts.
///
/// The same seed always yields the same records. Prices are unrounded so
/// floating-point sums depend on association order, which is what engine
/// equivalence tests need to exercise.
#[derive(Debug)]
pub struct ReceiptGenerator {
    rng: StdRng,
    next_id: u64,
}

impl ReceiptGenerator {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 0,
        }
    }

    /// Generate `n` receipts with 1 to 5 valid lines each.
    pub fn generate(&mut self, n: usize) -> Vec<Receipt> {
        (0..n).map(|_| self.receipt()).collect()
    }

    fn receipt(&mut self) -> Receipt {
        let id = self.next_id;
        self.next_id += 1;

        let rng = &mut self.rng;
        let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
        let (city, state) = PLACES[rng.random_range(0..PLACES.len())];
        let status = ReceiptStatus::ALL[rng.random_range(0..ReceiptStatus::ALL.len())];
        let timestamp = date_time(
            2024,
            rng.random_range(1..=12),
            rng.random_range(1..=28),
            rng.random_range(0..24),
            rng.random_range(0..60),
        );

        let mut builder = ReceiptBuilder::new(format!("gen-{id:08}"))
            .customer(first, last)
            .city(city, state)
            .status(status)
            .timestamp(timestamp)
            .loyalty(rng.random_range(0..500));
        for _ in 0..rng.random_range(1..=5) {
            let (name, low, high) = CATALOG[rng.random_range(0..CATALOG.len())];
            builder = builder.item(name, rng.random_range(1..=4), rng.random_range(low..high));
        }
        builder.build()
    }
}

impl Iterator for ReceiptGenerator {
    type Item = Receipt;

    fn next(&mut self) -> Option<Receipt> {
        Some(self.receipt())
    }
}
