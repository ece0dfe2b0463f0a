//! Ticket service: reservation holds, purchases and cancellations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::EventService;
use crate::domain::reservation::MAX_TICKETS_PER_RESERVATION;
use crate::domain::{
    Event, EventId, Payment, Reservation, ReservationId, Ticket, TicketId, TicketStatus, UserId,
};
use crate::error::ApiError;
use crate::persistence::{CacheStore, EventStore, PurchaseRecord, TicketStore, keys};

/// A reservation hold and when it lapses.
#[derive(Debug, Clone)]
pub struct ReservationHold {
    /// The hold as stored in the cache.
    pub reservation: Reservation,
    /// Lifetime of the hold.
    pub ttl: Duration,
    /// Instant after which the hold is gone.
    pub expires_at: DateTime<Utc>,
}

/// How the client paid.
#[derive(Debug, Clone)]
pub struct PaymentInfo {
    /// Payment method, e.g. `card`.
    pub method: String,
    /// Processor reference, generated when absent.
    pub transaction_id: Option<String>,
}

/// Tickets and payment produced by a purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// One paid ticket per reserved seat.
    pub tickets: Vec<Ticket>,
    /// Payment covering all tickets.
    pub payment: Payment,
}

/// A ticket together with its event, if the event still exists.
#[derive(Debug, Clone)]
pub struct OwnedTicket {
    /// The ticket.
    pub ticket: Ticket,
    /// Its event.
    pub event: Option<Event>,
}

/// Ticketing orchestration.
///
/// Holds live only in the cache; the relational store is touched once per
/// purchase or cancellation, inside a single transaction.
#[derive(Debug, Clone)]
pub struct TicketService {
    events: Arc<EventService>,
    event_store: Arc<dyn EventStore>,
    tickets: Arc<dyn TicketStore>,
    cache: Arc<dyn CacheStore>,
    reservation_ttl: Duration,
}

impl TicketService {
    /// Creates a new `TicketService`.
    #[must_use]
    pub fn new(
        events: Arc<EventService>,
        event_store: Arc<dyn EventStore>,
        tickets: Arc<dyn TicketStore>,
        cache: Arc<dyn CacheStore>,
        reservation_ttl: Duration,
    ) -> Self {
        Self {
            events,
            event_store,
            tickets,
            cache,
            reservation_ttl,
        }
    }

    /// Places a time-limited hold on `quantity` seats.
    ///
    /// The hold does not touch the relational store; seats are only taken
    /// when the hold is purchased.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for a quantity outside
    /// `1..=MAX_TICKETS_PER_RESERVATION`, [`ApiError::EventNotFound`] for an
    /// unknown or unpublished event, [`ApiError::EventStarted`] and
    /// [`ApiError::InsufficientSeats`].
    pub async fn reserve(
        &self,
        user_id: UserId,
        event_id: EventId,
        quantity: u32,
    ) -> Result<ReservationHold, ApiError> {
        if !(1..=MAX_TICKETS_PER_RESERVATION).contains(&quantity) {
            return Err(ApiError::InvalidRequest(format!(
                "quantity must be between 1 and {MAX_TICKETS_PER_RESERVATION}"
            )));
        }

        let event = self.events.get(event_id).await?;
        if !event.is_published {
            return Err(ApiError::EventNotFound(*event_id.as_uuid()));
        }
        if event.has_started(Utc::now()) {
            return Err(ApiError::EventStarted(event.title));
        }

        let available = self.events.available_seats(event_id).await?;
        if i64::from(quantity) > i64::from(available) {
            return Err(ApiError::InsufficientSeats {
                requested: quantity,
                available,
            });
        }

        let reservation = Reservation::new(user_id, event_id, quantity, event.price);
        let json = serde_json::to_string(&reservation)
            .map_err(|e| ApiError::Internal(format!("reservation serialization failed: {e}")))?;
        let tentative = available.saturating_sub_unsigned(quantity);

        self.cache
            .set(
                &keys::reservation(reservation.reservation_id),
                &json,
                Some(self.reservation_ttl),
            )
            .await?;
        self.cache
            .set(
                &keys::event_temp_seats(event_id),
                &tentative.to_string(),
                Some(self.reservation_ttl),
            )
            .await?;

        let expires_at = reservation.created_at
            + chrono::Duration::from_std(self.reservation_ttl).unwrap_or(chrono::Duration::zero());
        tracing::info!(
            reservation_id = %reservation.reservation_id,
            %event_id,
            %user_id,
            quantity,
            "seats reserved"
        );
        Ok(ReservationHold {
            reservation,
            ttl: self.reservation_ttl,
            expires_at,
        })
    }

    /// Turns a hold into paid tickets and a completed payment.
    ///
    /// # Errors
    ///
    /// [`ApiError::ReservationNotFound`] if the hold expired,
    /// [`ApiError::Forbidden`] if it belongs to someone else,
    /// [`ApiError::InsufficientSeats`] if the seats sold out meanwhile.
    pub async fn purchase(
        &self,
        user_id: UserId,
        reservation_id: ReservationId,
        payment: PaymentInfo,
    ) -> Result<PurchaseReceipt, ApiError> {
        if payment.method.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "paymentInfo.method is required".to_string(),
            ));
        }

        let hold_key = keys::reservation(reservation_id);
        let Some(json) = self.cache.get(&hold_key).await? else {
            return Err(ApiError::ReservationNotFound(*reservation_id.as_uuid()));
        };
        let reservation = parse_hold(&json)?;
        if reservation.user_id != user_id {
            return Err(ApiError::Forbidden(
                "reservation belongs to another user".to_string(),
            ));
        }
        // Consume the hold before committing: of concurrent purchases of the
        // same hold only the one that removes it goes on.
        let Some(json) = self.cache.take(&hold_key).await? else {
            return Err(ApiError::ReservationNotFound(*reservation_id.as_uuid()));
        };
        let reservation = parse_hold(&json)?;

        let now = Utc::now();
        let unit_price = reservation.unit_price();
        let tickets: Vec<Ticket> = (0..reservation.quantity)
            .map(|_| Ticket::paid(user_id, reservation.event_id, unit_price, now))
            .collect();
        let payment = Payment::completed(
            user_id,
            tickets.first().map(|t| t.id),
            reservation.price,
            payment.method,
            payment.transaction_id,
            now,
        );
        let record = PurchaseRecord {
            event_id: reservation.event_id,
            quantity: reservation.quantity,
            tickets,
            payment,
        };

        let remaining = match self.tickets.commit_purchase(&record).await {
            Ok(remaining) => remaining,
            Err(e) => {
                if !matches!(e, ApiError::InsufficientSeats { .. }) {
                    self.restore_hold(&hold_key, &reservation, &json).await;
                }
                return Err(e);
            }
        };

        // The purchase is committed; cache refresh failures must not turn it
        // into an error the client would retry.
        if let Err(e) = self
            .events
            .record_seats(reservation.event_id, remaining)
            .await
        {
            tracing::warn!(event_id = %reservation.event_id, error = %e, "seat counter refresh failed");
        }
        if let Err(e) = self
            .cache
            .delete(&[keys::event_temp_seats(reservation.event_id)])
            .await
        {
            tracing::warn!(event_id = %reservation.event_id, error = %e, "tentative counter cleanup failed");
        }

        tracing::info!(
            %reservation_id,
            event_id = %reservation.event_id,
            %user_id,
            tickets = record.tickets.len(),
            remaining,
            "purchase completed"
        );
        Ok(PurchaseReceipt {
            tickets: record.tickets,
            payment: record.payment,
        })
    }

    /// Puts a consumed hold back for whatever lifetime it had left, so a
    /// failed commit does not cost the caller their seats.
    async fn restore_hold(&self, hold_key: &str, reservation: &Reservation, json: &str) {
        let expires_at = reservation.created_at
            + chrono::Duration::from_std(self.reservation_ttl).unwrap_or(chrono::Duration::zero());
        let Ok(left) = (expires_at - Utc::now()).to_std() else {
            return;
        };
        if left.is_zero() {
            return;
        }
        if let Err(e) = self.cache.set(hold_key, json, Some(left)).await {
            tracing::warn!(
                reservation_id = %reservation.reservation_id,
                error = %e,
                "could not restore reservation hold"
            );
        }
    }

    /// The caller's tickets with their events, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn my_tickets(&self, user_id: UserId) -> Result<Vec<OwnedTicket>, ApiError> {
        let tickets = self.tickets.tickets_for_user(user_id).await?;

        let mut event_ids: Vec<EventId> = tickets.iter().map(|t| t.event_id).collect();
        event_ids.sort_unstable();
        event_ids.dedup();
        let events = self.event_store.find_events(&event_ids).await?;

        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let event = events.iter().find(|e| e.id == ticket.event_id).cloned();
                OwnedTicket { ticket, event }
            })
            .collect())
    }

    /// The caller's payments, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn my_payments(&self, user_id: UserId) -> Result<Vec<Payment>, ApiError> {
        self.tickets.payments_for_user(user_id).await
    }

    /// Cancels one of the caller's tickets and returns its seat.
    ///
    /// # Errors
    ///
    /// [`ApiError::TicketNotFound`] if the caller holds no such ticket,
    /// [`ApiError::Conflict`] if it is already cancelled,
    /// [`ApiError::EventStarted`] once the event has begun.
    pub async fn cancel(&self, user_id: UserId, ticket_id: TicketId) -> Result<Ticket, ApiError> {
        let ticket = self
            .tickets
            .find_user_ticket(ticket_id, user_id)
            .await?
            .ok_or(ApiError::TicketNotFound(*ticket_id.as_uuid()))?;
        if ticket.status == TicketStatus::Cancelled {
            return Err(ApiError::Conflict("Ticket is already cancelled".to_string()));
        }

        let event = self
            .event_store
            .find_event(ticket.event_id)
            .await?
            .ok_or(ApiError::EventNotFound(*ticket.event_id.as_uuid()))?;
        if event.has_started(Utc::now()) {
            return Err(ApiError::EventStarted(
                "cannot cancel tickets for past events".to_string(),
            ));
        }

        let (ticket, remaining) = self.tickets.cancel_ticket(ticket_id).await?;
        self.events.record_seats(ticket.event_id, remaining).await?;

        tracing::info!(%ticket_id, event_id = %ticket.event_id, remaining, "ticket cancelled");
        Ok(ticket)
    }
}

fn parse_hold(json: &str) -> Result<Reservation, ApiError> {
    serde_json::from_str(json).map_err(|e| ApiError::Cache(format!("unreadable reservation: {e}")))
}
