//! Ticketing DTOs: reserve, purchase, listings and cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Event, EventId, Payment, ReservationId, Ticket, UserId};
use crate::service::ticket_service::{OwnedTicket, PaymentInfo, PurchaseReceipt, ReservationHold};

/// Request body for `POST /api/tickets/reserve`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    /// Event to reserve seats for.
    pub event_id: EventId,
    /// Seats to hold, 1 to 10. Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Response body for `POST /api/tickets/reserve` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    /// Hold id, passed to the purchase call.
    pub reservation_id: ReservationId,
    /// Holder.
    pub user_id: UserId,
    /// Event.
    pub event_id: EventId,
    /// Seats held.
    pub quantity: u32,
    /// Total price of the hold.
    #[schema(value_type = String, example = "75.00")]
    pub price: Decimal,
    /// When the hold was placed.
    pub created_at: DateTime<Utc>,
    /// When the hold lapses.
    pub expires_at: DateTime<Utc>,
    /// Human-readable lifetime, e.g. `10 minutes`.
    pub expires_in: String,
}

impl From<ReservationHold> for ReservationResponse {
    fn from(hold: ReservationHold) -> Self {
        let secs = hold.ttl.as_secs();
        let expires_in = if secs % 60 == 0 {
            format!("{} minutes", secs / 60)
        } else {
            format!("{secs} seconds")
        };
        let r = hold.reservation;
        Self {
            reservation_id: r.reservation_id,
            user_id: r.user_id,
            event_id: r.event_id,
            quantity: r.quantity,
            price: r.price,
            created_at: r.created_at,
            expires_at: hold.expires_at,
            expires_in,
        }
    }
}

/// Payment details of a purchase.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfoDto {
    /// Payment method, e.g. `card`.
    pub method: String,
    /// Processor reference; generated when absent.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl From<PaymentInfoDto> for PaymentInfo {
    fn from(dto: PaymentInfoDto) -> Self {
        Self {
            method: dto.method,
            transaction_id: dto.transaction_id,
        }
    }
}

/// Request body for `POST /api/tickets/purchase`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Hold to pay for.
    pub reservation_id: ReservationId,
    /// Payment details.
    pub payment_info: PaymentInfoDto,
}

/// Response body for `POST /api/tickets/purchase` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseResponse {
    /// Issued tickets.
    pub tickets: Vec<Ticket>,
    /// Payment record.
    pub payment: Payment,
}

impl From<PurchaseReceipt> for PurchaseResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            tickets: receipt.tickets,
            payment: receipt.payment,
        }
    }
}

/// Event fields shown next to a ticket.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// Event id.
    pub id: EventId,
    /// Title.
    pub title: String,
    /// Venue.
    pub location: String,
    /// Start.
    pub start_date: DateTime<Utc>,
    /// End.
    pub end_date: Option<DateTime<Utc>>,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            location: event.location,
            start_date: event.start_date,
            end_date: event.end_date,
        }
    }
}

/// Entry of `GET /api/tickets/my-tickets`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketWithEvent {
    /// Ticket fields.
    #[serde(flatten)]
    pub ticket: Ticket,
    /// Its event, `null` if it has been removed.
    pub event: Option<EventSummary>,
}

impl From<OwnedTicket> for TicketWithEvent {
    fn from(owned: OwnedTicket) -> Self {
        Self {
            ticket: owned.ticket,
            event: owned.event.map(EventSummary::from),
        }
    }
}

/// Response body for `PUT /api/tickets/{id}/cancel`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    /// Confirmation message.
    pub message: String,
    /// The cancelled ticket.
    pub ticket: Ticket,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::Reservation;

    #[test]
    fn reserve_quantity_defaults_to_one() {
        let body = format!(r#"{{"eventId":"{}"}}"#, EventId::new());
        let Ok(req) = serde_json::from_str::<ReserveRequest>(&body) else {
            panic!("body should parse");
        };
        assert_eq!(req.quantity, 1);
    }

    #[test]
    fn hold_lifetime_is_reported_in_minutes() {
        let reservation =
            Reservation::new(UserId::new(), EventId::new(), 2, Decimal::new(1000, 2));
        let hold = ReservationHold {
            expires_at: reservation.created_at,
            reservation,
            ttl: Duration::from_secs(600),
        };
        let response = ReservationResponse::from(hold);
        assert_eq!(response.expires_in, "10 minutes");
        assert_eq!(response.price, Decimal::new(2000, 2));
    }
}
