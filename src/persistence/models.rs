//! Storage-side row and document shapes, and their conversion to the
//! domain types.
//!
//! Enum columns are stored as lowercase TEXT; MongoDB documents use
//! `ObjectId` keys and BSON dates.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Comment, Event, Media, MediaKind, Payment, Review, Role, Ticket, User,
};
use crate::error::ApiError;

/// A row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique login email.
    pub email: String,
    /// Bcrypt hash.
    pub password_hash: String,
    /// `admin`, `organizer` or `customer`.
    pub role: String,
    /// Optional phone.
    pub phone: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = ApiError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>().map_err(ApiError::Database)?,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row of the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning organizer.
    pub organizer_id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Venue.
    pub location: String,
    /// Start.
    pub start_date: DateTime<Utc>,
    /// End.
    pub end_date: Option<DateTime<Utc>>,
    /// Capacity.
    pub total_seats: i32,
    /// Unsold seats.
    pub available_seats: i32,
    /// `NUMERIC(10,2)` unit price.
    pub price: Decimal,
    /// Listed publicly.
    pub is_published: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id.into(),
            organizer_id: row.organizer_id.into(),
            title: row.title,
            description: row.description,
            location: row.location,
            start_date: row.start_date,
            end_date: row.end_date,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            price: row.price,
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row of the `tickets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TicketRow {
    /// Primary key.
    pub id: Uuid,
    /// Holder.
    pub user_id: Uuid,
    /// Event.
    pub event_id: Uuid,
    /// Unique human reference.
    pub ticket_number: String,
    /// Seat.
    pub seat_number: Option<String>,
    /// Price paid.
    pub price: Decimal,
    /// `reserved`, `paid` or `cancelled`.
    pub status: String,
    /// Payment time.
    pub purchased_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = ApiError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            event_id: row.event_id.into(),
            ticket_number: row.ticket_number,
            seat_number: row.seat_number,
            price: row.price,
            status: row.status.parse().map_err(ApiError::Database)?,
            purchased_at: row.purchased_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row of the `payments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    /// Primary key.
    pub id: Uuid,
    /// Payer.
    pub user_id: Uuid,
    /// First ticket of the purchase; nulled if the event is deleted.
    pub ticket_id: Option<Uuid>,
    /// Total charged.
    pub amount: Decimal,
    /// Payment method.
    pub payment_method: String,
    /// Processor reference.
    pub transaction_id: Option<String>,
    /// `pending`, `completed`, `failed` or `refunded`.
    pub status: String,
    /// Payment time.
    pub payment_date: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = ApiError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            ticket_id: row.ticket_id.map(Into::into),
            amount: row.amount,
            payment_method: row.payment_method,
            transaction_id: row.transaction_id,
            status: row.status.parse().map_err(ApiError::Database)?,
            payment_date: row.payment_date,
        })
    }
}

/// Converts a domain document id into an `ObjectId`. Ids that are not
/// 24-char hex cannot exist in the collection.
pub fn object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn to_bson_date(dt: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_date(dt: mongodb::bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// A document of the `comments` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDoc {
    /// Document key.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Event UUID as string.
    pub event_id: String,
    /// Author UUID as string.
    pub user_id: String,
    /// Author name.
    pub user_name: String,
    /// Body.
    pub text: String,
    /// Creation time.
    pub created_at: mongodb::bson::DateTime,
}

impl CommentDoc {
    /// Builds a document from a domain comment.
    ///
    /// # Errors
    ///
    /// [`ApiError::DocumentStore`] if the id is not an `ObjectId`.
    pub fn from_domain(comment: &Comment) -> Result<Self, ApiError> {
        Ok(Self {
            id: parse_doc_id(&comment.id)?,
            event_id: comment.event_id.to_string(),
            user_id: comment.user_id.to_string(),
            user_name: comment.user_name.clone(),
            text: comment.text.clone(),
            created_at: to_bson_date(comment.created_at),
        })
    }
}

impl TryFrom<CommentDoc> for Comment {
    type Error = ApiError;

    fn try_from(doc: CommentDoc) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.to_hex(),
            event_id: parse_uuid(&doc.event_id)?.into(),
            user_id: parse_uuid(&doc.user_id)?.into(),
            user_name: doc.user_name,
            text: doc.text,
            created_at: from_bson_date(doc.created_at),
        })
    }
}

/// A document of the `reviews` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDoc {
    /// Document key.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Event UUID as string.
    pub event_id: String,
    /// Author UUID as string.
    pub user_id: String,
    /// Author name.
    pub user_name: String,
    /// 1–5.
    pub rating: i32,
    /// Headline.
    pub title: Option<String>,
    /// Body.
    pub text: String,
    /// Creation time.
    pub created_at: mongodb::bson::DateTime,
    /// Last edit time.
    pub updated_at: Option<mongodb::bson::DateTime>,
}

impl ReviewDoc {
    /// Builds a document from a domain review.
    ///
    /// # Errors
    ///
    /// [`ApiError::DocumentStore`] if the id is not an `ObjectId`.
    pub fn from_domain(review: &Review) -> Result<Self, ApiError> {
        Ok(Self {
            id: parse_doc_id(&review.id)?,
            event_id: review.event_id.to_string(),
            user_id: review.user_id.to_string(),
            user_name: review.user_name.clone(),
            rating: i32::from(review.rating),
            title: review.title.clone(),
            text: review.text.clone(),
            created_at: to_bson_date(review.created_at),
            updated_at: review.updated_at.map(to_bson_date),
        })
    }
}

impl TryFrom<ReviewDoc> for Review {
    type Error = ApiError;

    fn try_from(doc: ReviewDoc) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.to_hex(),
            event_id: parse_uuid(&doc.event_id)?.into(),
            user_id: parse_uuid(&doc.user_id)?.into(),
            user_name: doc.user_name,
            rating: u8::try_from(doc.rating)
                .map_err(|_| ApiError::DocumentStore(format!("bad rating {}", doc.rating)))?,
            title: doc.title,
            text: doc.text,
            created_at: from_bson_date(doc.created_at),
            updated_at: doc.updated_at.map(from_bson_date),
        })
    }
}

/// A document of the `media` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDoc {
    /// Document key.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Event UUID as string.
    pub event_id: String,
    /// `image` or `video`.
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Public URL.
    pub url: String,
    /// Caption.
    pub caption: String,
    /// Uploader UUID as string.
    pub uploaded_by: String,
    /// Upload time.
    pub created_at: mongodb::bson::DateTime,
}

impl MediaDoc {
    /// Builds a document from a domain media record.
    ///
    /// # Errors
    ///
    /// [`ApiError::DocumentStore`] if the id is not an `ObjectId`.
    pub fn from_domain(media: &Media) -> Result<Self, ApiError> {
        Ok(Self {
            id: parse_doc_id(&media.id)?,
            event_id: media.event_id.to_string(),
            kind: media.kind,
            url: media.url.clone(),
            caption: media.caption.clone(),
            uploaded_by: media.uploaded_by.to_string(),
            created_at: to_bson_date(media.created_at),
        })
    }
}

impl TryFrom<MediaDoc> for Media {
    type Error = ApiError;

    fn try_from(doc: MediaDoc) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id.to_hex(),
            event_id: parse_uuid(&doc.event_id)?.into(),
            kind: doc.kind,
            url: doc.url,
            caption: doc.caption,
            uploaded_by: parse_uuid(&doc.uploaded_by)?.into(),
            created_at: from_bson_date(doc.created_at),
        })
    }
}

fn parse_doc_id(id: &str) -> Result<ObjectId, ApiError> {
    object_id(id).ok_or_else(|| ApiError::DocumentStore(format!("invalid document id: {id}")))
}

fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse()
        .map_err(|_| ApiError::DocumentStore(format!("invalid uuid in document: {s}")))
}
