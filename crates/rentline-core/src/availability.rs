//! # Availability Calculator
//!
//! Capacity arithmetic over reservation intervals. Pure: the caller fetches
//! the product's stock and the intervals overlapping the window (the
//! Interval Store's job) and this module answers "how many units are left".
//!
//! ## Reserved = peak concurrent demand inside the window
//! ```text
//!   stock S = 5                 requested window [Jun 3, Jun 7)
//!                                 ├─────────────────────────┤
//!   O1 committed ×3  ├──────────────────┤ Jun 1 .. Jun 5
//!   O3 active    ×1                          ├──────────┤ Jun 5 .. Jun 6
//!   O4 released  ×5  ├────────────────────────────────────┤ (ignored)
//!
//!   sweep inside window:  Jun 3: 3   Jun 5: 1   Jun 6: 0   → peak R = 3
//!   available = max(0, S − R) = 2
//! ```
//!
//! Only intervals that overlap the window participate, so the cost is
//! O(k log k) in the number of overlapping intervals, not in history.
//! Touching windows (`a.end == b.start`) do not overlap: the sweep applies
//! releases before claims at the same instant.
//!
//! Reserved is the peak, not the plain sum of overlapping quantities. The two
//! agree whenever every overlapping claim covers one common instant; they
//! differ for claims that overlap the window but never each other, e.g. two
//! back-to-back rentals of 3 inside one 5-unit window reserve 3, not 6.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::StockShortfall;
use crate::types::{OrderLine, ReservationInterval};

// =============================================================================
// Claims
// =============================================================================

/// A quantity held over a half-open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub quantity: i64,
}

impl Claim {
    #[inline]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.starts_at < end && start < self.ends_at
    }
}

impl From<&ReservationInterval> for Claim {
    fn from(interval: &ReservationInterval) -> Self {
        Claim {
            starts_at: interval.starts_at,
            ends_at: interval.ends_at,
            quantity: interval.quantity,
        }
    }
}

impl From<&OrderLine> for Claim {
    fn from(line: &OrderLine) -> Self {
        Claim {
            starts_at: line.starts_at,
            ends_at: line.ends_at,
            quantity: line.quantity,
        }
    }
}

/// Claims of every interval that consumes capacity.
pub fn counted_claims<'a>(
    intervals: impl IntoIterator<Item = &'a ReservationInterval>,
) -> Vec<Claim> {
    intervals
        .into_iter()
        .filter(|i| i.level.counts_against_capacity())
        .map(Claim::from)
        .collect()
}

// =============================================================================
// Peak Demand
// =============================================================================

/// Maximum number of units simultaneously claimed at any instant of
/// `[start, end)`.
///
/// Claims outside the window are ignored; claims straddling a boundary are
/// clipped to it.
pub fn peak_demand(claims: &[Claim], start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let mut events: Vec<(DateTime<Utc>, i64)> = Vec::with_capacity(claims.len() * 2);

    for claim in claims.iter().filter(|c| c.overlaps(start, end)) {
        events.push((claim.starts_at.max(start), claim.quantity));
        events.push((claim.ends_at.min(end), -claim.quantity));
    }

    // Releases (negative deltas) sort before claims at the same instant.
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut current = 0i64;
    let mut peak = 0i64;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak
}

/// `max(0, stock − reserved)`.
#[inline]
pub fn available_units(stock: i64, reserved: i64) -> i64 {
    (stock - reserved).max(0)
}

// =============================================================================
// Availability Result
// =============================================================================

/// Answer to `check_availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Availability {
    pub product_id: String,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    /// Catalog capacity.
    pub stock: i64,
    /// Peak committed + active demand inside the window.
    pub reserved: i64,
    pub available_units: i64,
    pub requested: i64,
    /// `available_units >= requested`.
    pub is_available: bool,
}

impl Availability {
    /// Computes availability of `requested` units over `[starts_at, ends_at)`.
    pub fn compute(
        product_id: impl Into<String>,
        stock: i64,
        claims: &[Claim],
        requested: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        let reserved = peak_demand(claims, starts_at, ends_at);
        let available = available_units(stock, reserved);
        Availability {
            product_id: product_id.into(),
            starts_at,
            ends_at,
            stock,
            reserved,
            available_units: available,
            requested,
            is_available: available >= requested,
        }
    }
}

// =============================================================================
// Commit Planning
// =============================================================================

/// Capacity snapshot of one product, taken inside the confirm transaction.
#[derive(Debug, Clone, Default)]
pub struct ProductCapacity {
    pub stock: i64,
    /// Committed + active claims of *other* orders.
    pub claims: Vec<Claim>,
}

/// Decides whether every line of an order can be committed.
///
/// Lines are checked in order. A line that fits is added to the product's
/// claims before the next line is checked, so two lines of the same order
/// on the same product cannot jointly overbook it. Every failing line is
/// reported.
pub fn plan_commit(
    lines: &[OrderLine],
    capacity: &HashMap<String, ProductCapacity>,
) -> Result<(), Vec<StockShortfall>> {
    let mut accepted: HashMap<&str, Vec<Claim>> = HashMap::new();
    let mut shortfalls = Vec::new();

    for line in lines {
        let (stock, mut claims) = match capacity.get(&line.product_id) {
            Some(cap) => (cap.stock, cap.claims.clone()),
            None => (0, Vec::new()),
        };
        if let Some(ours) = accepted.get(line.product_id.as_str()) {
            claims.extend_from_slice(ours);
        }

        let available = available_units(stock, peak_demand(&claims, line.starts_at, line.ends_at));
        if line.quantity > available {
            shortfalls.push(StockShortfall {
                line_id: line.id.clone(),
                product_id: line.product_id.clone(),
                requested: line.quantity,
                available,
            });
        } else {
            accepted
                .entry(line.product_id.as_str())
                .or_default()
                .push(Claim::from(line));
        }
    }

    if shortfalls.is_empty() {
        Ok(())
    } else {
        Err(shortfalls)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
