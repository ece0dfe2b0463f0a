//! Reservation holds kept in the cache until purchase or expiry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EventId, ReservationId, UserId};

/// Largest number of tickets a single reservation may hold.
pub const MAX_TICKETS_PER_RESERVATION: u32 = 10;

/// A tentative seat claim. Stored as JSON under `reservation:{id}` with a
/// TTL; once the key expires the seats are implicitly released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Hold identifier.
    pub reservation_id: ReservationId,
    /// User who placed the hold.
    pub user_id: UserId,
    /// Event the seats belong to.
    pub event_id: EventId,
    /// Number of seats held.
    pub quantity: u32,
    /// Total price: unit price × quantity.
    pub price: Decimal,
    /// When the hold was placed.
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a hold priced at `unit_price × quantity`.
    #[must_use]
    pub fn new(user_id: UserId, event_id: EventId, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            reservation_id: ReservationId::new(),
            user_id,
            event_id,
            quantity,
            price: (unit_price * Decimal::from(quantity)).round_dp(2),
            created_at: Utc::now(),
        }
    }

    /// Price of each ticket issued from this hold.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        if self.quantity == 0 {
            return self.price;
        }
        (self.price / Decimal::from(self.quantity)).round_dp(2)
    }
}
