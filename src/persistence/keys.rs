//! Cache key layout.

use crate::domain::{EventId, ReservationId};

/// Cached JSON copy of an event.
#[must_use]
pub fn event(id: EventId) -> String {
    format!("event:{id}")
}

/// Cached available-seat counter of an event.
#[must_use]
pub fn event_seats(id: EventId) -> String {
    format!("event:{id}:seats")
}

/// Tentative seat counter written alongside a reservation hold.
#[must_use]
pub fn event_temp_seats(id: EventId) -> String {
    format!("event:{id}:temp_seats")
}

/// Reservation hold.
#[must_use]
pub fn reservation(id: ReservationId) -> String {
    format!("reservation:{id}")
}
