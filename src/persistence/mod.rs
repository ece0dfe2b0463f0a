//! Persistence layer: the three stores behind the service layer.
//!
//! - **Relational** ([`UserStore`], [`EventStore`], [`TicketStore`]):
//!   users, events, tickets and payments in PostgreSQL via `sqlx::PgPool`.
//! - **Document** ([`DocumentStore`]): comments, reviews and media in
//!   MongoDB.
//! - **Cache** ([`CacheStore`]): read-through copies of events and seat
//!   counters plus reservation holds with a TTL, in Redis.
//!
//! Each trait also has an in-process implementation in [`memory`], used by
//! the test suite and by `IN_MEMORY_STORES=true`.

pub mod keys;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod postgres;
pub mod redis_cache;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::domain::{
    Comment, Event, EventId, Media, Payment, Review, Ticket, TicketId, User, UserId,
};
use crate::error::ApiError;

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync + fmt::Debug {
    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// [`ApiError::Conflict`] if the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), ApiError>;

    /// Looks up an account by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, ApiError>;

    /// Looks up an account by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    /// Overwrites the mutable fields of an existing account.
    ///
    /// # Errors
    ///
    /// [`ApiError::UserNotFound`] if the account is gone, or
    /// [`ApiError::Conflict`] if the new email belongs to someone else.
    async fn update_user(&self, user: &User) -> Result<(), ApiError>;
}

/// Filter and page window for public event listings.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only events owned by this organizer.
    pub organizer_id: Option<UserId>,
    /// Case-insensitive substring match on the venue.
    pub location: Option<String>,
    /// Only events starting at or after this instant.
    pub starts_after: Option<DateTime<Utc>>,
    /// Rows to skip.
    pub offset: u32,
    /// Maximum rows to return.
    pub limit: u32,
}

/// One page of events plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    /// Events on this page, ordered by start date.
    pub events: Vec<Event>,
    /// Matches across all pages.
    pub total: u64,
}

/// Event listing storage.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Inserts a new listing.
    async fn insert_event(&self, event: &Event) -> Result<(), ApiError>;

    /// Looks up a listing by id, published or not.
    async fn find_event(&self, id: EventId) -> Result<Option<Event>, ApiError>;

    /// Looks up several listings at once. Missing ids are skipped.
    async fn find_events(&self, ids: &[EventId]) -> Result<Vec<Event>, ApiError>;

    /// Lists published events matching `filter`.
    async fn list_published_events(&self, filter: &EventFilter) -> Result<EventPage, ApiError>;

    /// Writes the editable fields of `event` and returns the stored row.
    ///
    /// `available_seats` is not taken from `event`: the store shifts its
    /// own current value by the change in `total_seats`, so concurrent
    /// sales are never overwritten.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] if the row is gone, or
    /// [`ApiError::InvalidRequest`] if the new capacity is below the seats
    /// sold so far.
    async fn update_event(&self, event: &Event) -> Result<Event, ApiError>;

    /// Deletes a listing and its tickets. Returns `false` if it did not exist.
    async fn delete_event(&self, id: EventId) -> Result<bool, ApiError>;
}

/// Everything written when a reservation is paid for.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    /// Event whose seats are consumed.
    pub event_id: EventId,
    /// Seats consumed; equals `tickets.len()`.
    pub quantity: u32,
    /// Paid tickets to insert.
    pub tickets: Vec<Ticket>,
    /// Payment covering all tickets.
    pub payment: Payment,
}

/// Ticket and payment storage.
#[async_trait]
pub trait TicketStore: Send + Sync + fmt::Debug {
    /// Atomically decrements the event's available seats by
    /// `purchase.quantity` (only if enough remain), inserts the tickets and
    /// the payment. Returns the seats left afterwards.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] or [`ApiError::InsufficientSeats`];
    /// nothing is written in either case.
    async fn commit_purchase(&self, purchase: &PurchaseRecord) -> Result<i32, ApiError>;

    /// Looks up a ticket held by `user_id`.
    async fn find_user_ticket(
        &self,
        ticket_id: TicketId,
        user_id: UserId,
    ) -> Result<Option<Ticket>, ApiError>;

    /// All tickets held by `user_id`, newest first.
    async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<Ticket>, ApiError>;

    /// Atomically marks the ticket cancelled and returns its seat to the
    /// event. Returns the updated ticket and the event's seats left.
    ///
    /// # Errors
    ///
    /// [`ApiError::TicketNotFound`], or [`ApiError::Conflict`] if the ticket
    /// was already cancelled.
    async fn cancel_ticket(&self, ticket_id: TicketId) -> Result<(Ticket, i32), ApiError>;

    /// Payments made by `user_id`, newest first.
    async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, ApiError>;
}

/// Comment, review and media storage.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Stores a comment.
    async fn insert_comment(&self, comment: &Comment) -> Result<(), ApiError>;

    /// Comments on an event, newest first.
    async fn comments_for_event(&self, event_id: EventId) -> Result<Vec<Comment>, ApiError>;

    /// Stores a review.
    ///
    /// # Errors
    ///
    /// [`ApiError::Conflict`] if the user already reviewed the event.
    async fn insert_review(&self, review: &Review) -> Result<(), ApiError>;

    /// Looks up a review by document id.
    async fn find_review(&self, id: &str) -> Result<Option<Review>, ApiError>;

    /// All reviews, newest first.
    async fn list_reviews(&self) -> Result<Vec<Review>, ApiError>;

    /// Reviews of an event, newest first.
    async fn reviews_for_event(&self, event_id: EventId) -> Result<Vec<Review>, ApiError>;

    /// Replaces a review. Returns `false` if it no longer exists.
    async fn update_review(&self, review: &Review) -> Result<bool, ApiError>;

    /// Deletes a review. Returns `false` if it did not exist.
    async fn delete_review(&self, id: &str) -> Result<bool, ApiError>;

    /// Stores a media record.
    async fn insert_media(&self, media: &Media) -> Result<(), ApiError>;

    /// Media of an event, newest first.
    async fn media_for_event(&self, event_id: EventId) -> Result<Vec<Media>, ApiError>;

    /// Removes every comment, review and media record of an event.
    /// Returns the number of documents deleted.
    async fn delete_event_documents(&self, event_id: EventId) -> Result<u64, ApiError>;
}

/// String key/value cache with optional expiry.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Reads a key. Expired keys read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;

    /// Writes a key, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), ApiError>;

    /// Deletes keys. Missing keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), ApiError>;

    /// Reads and removes a key in one atomic step. Of several concurrent
    /// callers at most one sees the value.
    async fn take(&self, key: &str) -> Result<Option<String>, ApiError>;
}

/// Handles to all stores, shared by the services.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Accounts.
    pub users: Arc<dyn UserStore>,
    /// Event listings.
    pub events: Arc<dyn EventStore>,
    /// Tickets and payments.
    pub tickets: Arc<dyn TicketStore>,
    /// Comments, reviews and media.
    pub documents: Arc<dyn DocumentStore>,
    /// Cache and reservation holds.
    pub cache: Arc<dyn CacheStore>,
}

impl Stores {
    /// In-process stores sharing one relational state.
    #[must_use]
    pub fn in_memory() -> Self {
        let relational = Arc::new(memory::MemoryStore::new());
        Self {
            users: Arc::clone(&relational) as Arc<dyn UserStore>,
            events: Arc::clone(&relational) as Arc<dyn EventStore>,
            tickets: relational as Arc<dyn TicketStore>,
            documents: Arc::new(memory::MemoryDocumentStore::new()),
            cache: Arc::new(memory::MemoryCache::new()),
        }
    }

    /// Connects to PostgreSQL, MongoDB and Redis, applying SQL migrations
    /// first when `config.run_migrations` is set.
    ///
    /// # Errors
    ///
    /// Returns the first connection or migration failure.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let pg = postgres::PostgresStore::connect(config).await?;
        if config.run_migrations {
            pg.migrate().await?;
        }
        let relational = Arc::new(pg);
        let documents =
            mongo::MongoDocumentStore::connect(&config.mongo_uri, &config.mongo_database).await?;
        let cache = redis_cache::RedisCache::connect(&config.redis_url).await?;

        tracing::info!("connected to postgres, mongodb and redis");

        Ok(Self {
            users: Arc::clone(&relational) as Arc<dyn UserStore>,
            events: Arc::clone(&relational) as Arc<dyn EventStore>,
            tickets: relational as Arc<dyn TicketStore>,
            documents: Arc::new(documents),
            cache: Arc::new(cache),
        })
    }
}
