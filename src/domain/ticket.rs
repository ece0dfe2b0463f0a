//! Tickets and payments.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::short_reference;
use super::{EventId, PaymentId, TicketId, UserId};

/// Lifecycle of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Held but not yet paid.
    Reserved,
    /// Paid and valid for entry.
    Paid,
    /// Cancelled by the holder; its seat went back to the event.
    Cancelled,
}

impl TicketStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(Self::Reserved),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// A single admission ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket identifier.
    pub id: TicketId,
    /// Holder.
    pub user_id: UserId,
    /// Event the ticket admits to.
    pub event_id: EventId,
    /// Human-facing reference, e.g. `TIX-1A2B3C4D`.
    pub ticket_number: String,
    /// Assigned seat, if the venue is seated.
    pub seat_number: Option<String>,
    /// Price paid for this ticket.
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    /// Current status.
    pub status: TicketStatus,
    /// When payment completed.
    pub purchased_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Issues a paid ticket for `event_id` at `price`.
    #[must_use]
    pub fn paid(user_id: UserId, event_id: EventId, price: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: TicketId::new(),
            user_id,
            event_id,
            ticket_number: format!("TIX-{}", short_reference(8)),
            seat_number: None,
            price,
            status: TicketStatus::Paid,
            purchased_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting confirmation.
    Pending,
    /// Money captured.
    Completed,
    /// Payment declined.
    Failed,
    /// Money returned.
    Refunded,
}

impl PaymentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Record of money taken for a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment identifier.
    pub id: PaymentId,
    /// Paying user.
    pub user_id: UserId,
    /// First ticket of the purchase.
    pub ticket_id: Option<TicketId>,
    /// Total charged.
    #[schema(value_type = String, example = "99.98")]
    pub amount: Decimal,
    /// Method reported by the client (card, transfer, ...).
    pub payment_method: String,
    /// Processor reference.
    pub transaction_id: Option<String>,
    /// Current status.
    pub status: PaymentStatus,
    /// When the payment was taken.
    pub payment_date: DateTime<Utc>,
}

impl Payment {
    /// Builds a completed payment. Without a processor reference one is
    /// generated as `TRX-XXXXXXXX`.
    #[must_use]
    pub fn completed(
        user_id: UserId,
        ticket_id: Option<TicketId>,
        amount: Decimal,
        payment_method: String,
        transaction_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let transaction_id = transaction_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("TRX-{}", short_reference(8)));
        Self {
            id: PaymentId::new(),
            user_id,
            ticket_id,
            amount,
            payment_method,
            transaction_id: Some(transaction_id),
            status: PaymentStatus::Completed,
            payment_date: now,
        }
    }
}
