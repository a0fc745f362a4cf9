//! Receipt record model.
//!
//! Everything in this module is read-only input to the engines. Records are
//! shared between worker threads by reference and never mutated after
//! construction.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a receipt.
///
/// Declaration order is significant: it is the tie-break order used when
/// ranking statuses with equal revenue and order counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Created,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl ReceiptStatus {
    /// All statuses in declaration order.
    pub const ALL: [ReceiptStatus; 6] = [
        ReceiptStatus::Created,
        ReceiptStatus::Paid,
        ReceiptStatus::Shipped,
        ReceiptStatus::Delivered,
        ReceiptStatus::Cancelled,
        ReceiptStatus::Refunded,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Categorical bucket derived from a line item's unit price.
///
/// Bounds are half-open `[min, max)`, so a price sitting exactly on a boundary
/// belongs to the higher tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    Budget,
    Standard,
    Premium,
    Luxury,
}

impl PriceTier {
    /// All tiers in declaration order.
    pub const ALL: [PriceTier; 4] = [
        PriceTier::Budget,
        PriceTier::Standard,
        PriceTier::Premium,
        PriceTier::Luxury,
    ];

    /// Inclusive lower bound and exclusive upper bound of the tier.
    #[must_use]
    pub const fn bounds(self) -> (f64, f64) {
        match self {
            Self::Budget => (0.0, 20.0),
            Self::Standard => (20.0, 100.0),
            Self::Premium => (100.0, 250.0),
            Self::Luxury => (250.0, f64::INFINITY),
        }
    }

    /// Classify a unit price. Anything that falls outside every bucket
    /// (negative or NaN) lands in `Luxury`, matching the catch-all tier.
    #[must_use]
    pub fn from_unit_price(unit_price: f64) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| {
                let (min, max) = tier.bounds();
                unit_price >= min && unit_price < max
            })
            .unwrap_or(Self::Luxury)
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Budget => "BUDGET",
            Self::Standard => "STANDARD",
            Self::Premium => "PREMIUM",
            Self::Luxury => "LUXURY",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
}

impl Customer {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Identity used for every per-customer tally: `"first last"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Address with only the fields the aggregation reads.
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            address_line1: String::new(),
            address_line2: String::new(),
            city: city.into(),
            state: state.into(),
            postal_code: String::new(),
            country: String::new(),
        }
    }
}

/// One line of a receipt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// A line contributes to the tallies only with a positive quantity and a
    /// finite, non-negative unit price.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.quantity > 0 && self.unit_price.is_finite() && self.unit_price >= 0.0
    }

    /// `quantity × unit_price`.
    #[must_use]
    pub fn revenue(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }

    #[must_use]
    pub fn price_tier(&self) -> PriceTier {
        PriceTier::from_unit_price(self.unit_price)
    }
}

/// An immutable transaction record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub timestamp: NaiveDateTime,
    pub status: ReceiptStatus,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub loyalty_points_earned: u32,
    pub items: Vec<LineItem>,
}

impl Receipt {
    /// Calendar month of the receipt timestamp, `1..=12`.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }

    /// Sum of the revenue of every valid line item.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.valid_items().map(LineItem::revenue).sum()
    }

    /// Line items that pass [`LineItem::is_valid`], in receipt order.
    pub fn valid_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|item| item.is_valid())
    }

    /// A receipt is aggregated only when at least one line item is valid.
    #[must_use]
    pub fn is_aggregatable(&self) -> bool {
        self.items.iter().any(LineItem::is_valid)
    }
}
