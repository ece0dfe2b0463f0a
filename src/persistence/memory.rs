//! In-process store implementations.
//!
//! All relational tables live behind a single [`tokio::sync::RwLock`], so a
//! purchase or cancellation holds the write lock for its whole duration and
//! is atomic with respect to every other store call, mirroring the
//! transactions of the PostgreSQL implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{
    CacheStore, DocumentStore, EventFilter, EventPage, EventStore, PurchaseRecord, TicketStore,
    UserStore,
};
use crate::domain::{
    Comment, Event, EventId, Media, Payment, Review, Ticket, TicketId, TicketStatus, User, UserId,
};
use crate::error::ApiError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    tickets: HashMap<TicketId, Ticket>,
    payments: Vec<Payment>,
}

/// Relational store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), ApiError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ApiError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), ApiError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or(ApiError::UserNotFound(*user.id.as_uuid()))?;
        *stored = user.clone();
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<(), ApiError> {
        self.tables.write().await.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn find_events(&self, ids: &[EventId]) -> Result<Vec<Event>, ApiError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.events.get(id).cloned())
            .collect())
    }

    async fn list_published_events(&self, filter: &EventFilter) -> Result<EventPage, ApiError> {
        let tables = self.tables.read().await;
        let location = filter.location.as_ref().map(|l| l.to_lowercase());
        let mut matches: Vec<&Event> = tables
            .events
            .values()
            .filter(|e| e.is_published)
            .filter(|e| filter.organizer_id.is_none_or(|o| e.organizer_id == o))
            .filter(|e| {
                location
                    .as_ref()
                    .is_none_or(|l| e.location.to_lowercase().contains(l))
            })
            .filter(|e| filter.starts_after.is_none_or(|t| e.start_date >= t))
            .collect();
        matches.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));

        let total = matches.len() as u64;
        let events = matches
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(EventPage { events, total })
    }

    async fn update_event(&self, event: &Event) -> Result<Event, ApiError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .events
            .get_mut(&event.id)
            .ok_or(ApiError::EventNotFound(*event.id.as_uuid()))?;

        let available = stored.available_seats + (event.total_seats - stored.total_seats);
        if available < 0 {
            return Err(ApiError::InvalidRequest(format!(
                "totalSeats cannot be lower than the {} seats already sold",
                stored.sold_seats()
            )));
        }

        let mut updated = event.clone();
        updated.available_seats = available;
        updated.organizer_id = stored.organizer_id;
        updated.created_at = stored.created_at;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, ApiError> {
        let mut tables = self.tables.write().await;
        let existed = tables.events.remove(&id).is_some();
        if existed {
            let removed: Vec<TicketId> = tables
                .tickets
                .values()
                .filter(|t| t.event_id == id)
                .map(|t| t.id)
                .collect();
            for ticket_id in &removed {
                tables.tickets.remove(ticket_id);
            }
            for payment in &mut tables.payments {
                if payment.ticket_id.is_some_and(|t| removed.contains(&t)) {
                    payment.ticket_id = None;
                }
            }
        }
        Ok(existed)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn commit_purchase(&self, purchase: &PurchaseRecord) -> Result<i32, ApiError> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&purchase.event_id)
            .ok_or(ApiError::EventNotFound(*purchase.event_id.as_uuid()))?;

        let quantity = i32::try_from(purchase.quantity)
            .map_err(|_| ApiError::InvalidRequest("quantity out of range".to_string()))?;
        if event.available_seats < quantity {
            return Err(ApiError::InsufficientSeats {
                requested: purchase.quantity,
                available: event.available_seats,
            });
        }
        event.available_seats -= quantity;
        event.updated_at = chrono::Utc::now();
        let remaining = event.available_seats;

        for ticket in &purchase.tickets {
            tables.tickets.insert(ticket.id, ticket.clone());
        }
        tables.payments.push(purchase.payment.clone());
        Ok(remaining)
    }

    async fn find_user_ticket(
        &self,
        ticket_id: TicketId,
        user_id: UserId,
    ) -> Result<Option<Ticket>, ApiError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .get(&ticket_id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<Ticket>, ApiError> {
        let tables = self.tables.read().await;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn cancel_ticket(&self, ticket_id: TicketId) -> Result<(Ticket, i32), ApiError> {
        let mut tables = self.tables.write().await;
        let ticket = tables
            .tickets
            .get(&ticket_id)
            .ok_or(ApiError::TicketNotFound(*ticket_id.as_uuid()))?;
        if ticket.status == TicketStatus::Cancelled {
            return Err(ApiError::Conflict("Ticket is already cancelled".to_string()));
        }
        let event_id = ticket.event_id;
        let event = tables
            .events
            .get_mut(&event_id)
            .ok_or(ApiError::EventNotFound(*event_id.as_uuid()))?;
        let now = chrono::Utc::now();
        event.available_seats = (event.available_seats + 1).min(event.total_seats);
        event.updated_at = now;
        let remaining = event.available_seats;

        let ticket = tables
            .tickets
            .get_mut(&ticket_id)
            .ok_or(ApiError::TicketNotFound(*ticket_id.as_uuid()))?;
        ticket.status = TicketStatus::Cancelled;
        ticket.updated_at = now;
        Ok((ticket.clone(), remaining))
    }

    async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, ApiError> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }
}

#[derive(Debug, Default)]
struct Documents {
    comments: Vec<Comment>,
    reviews: Vec<Review>,
    media: Vec<Media>,
}

/// Document store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<Documents>,
}

impl MemoryDocumentStore {
    /// Creates empty collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest-first copy of the documents matching `keep`.
fn newest_first<T: Clone>(
    items: &[T],
    keep: impl Fn(&T) -> bool,
    created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = items.iter().filter(|i| keep(i)).cloned().collect();
    out.sort_by_key(|i| std::cmp::Reverse(created(i)));
    out
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_comment(&self, comment: &Comment) -> Result<(), ApiError> {
        self.docs.write().await.comments.push(comment.clone());
        Ok(())
    }

    async fn comments_for_event(&self, event_id: EventId) -> Result<Vec<Comment>, ApiError> {
        let docs = self.docs.read().await;
        Ok(newest_first(
            &docs.comments,
            |c| c.event_id == event_id,
            |c| c.created_at,
        ))
    }

    async fn insert_review(&self, review: &Review) -> Result<(), ApiError> {
        let mut docs = self.docs.write().await;
        if docs
            .reviews
            .iter()
            .any(|r| r.event_id == review.event_id && r.user_id == review.user_id)
        {
            return Err(ApiError::Conflict(
                "You have already reviewed this event".to_string(),
            ));
        }
        docs.reviews.push(review.clone());
        Ok(())
    }

    async fn find_review(&self, id: &str) -> Result<Option<Review>, ApiError> {
        let docs = self.docs.read().await;
        Ok(docs.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, ApiError> {
        let docs = self.docs.read().await;
        Ok(newest_first(&docs.reviews, |_| true, |r| r.created_at))
    }

    async fn reviews_for_event(&self, event_id: EventId) -> Result<Vec<Review>, ApiError> {
        let docs = self.docs.read().await;
        Ok(newest_first(
            &docs.reviews,
            |r| r.event_id == event_id,
            |r| r.created_at,
        ))
    }

    async fn update_review(&self, review: &Review) -> Result<bool, ApiError> {
        let mut docs = self.docs.write().await;
        match docs.reviews.iter_mut().find(|r| r.id == review.id) {
            Some(stored) => {
                *stored = review.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_review(&self, id: &str) -> Result<bool, ApiError> {
        let mut docs = self.docs.write().await;
        let before = docs.reviews.len();
        docs.reviews.retain(|r| r.id != id);
        Ok(docs.reviews.len() != before)
    }

    async fn insert_media(&self, media: &Media) -> Result<(), ApiError> {
        self.docs.write().await.media.push(media.clone());
        Ok(())
    }

    async fn media_for_event(&self, event_id: EventId) -> Result<Vec<Media>, ApiError> {
        let docs = self.docs.read().await;
        Ok(newest_first(
            &docs.media,
            |m| m.event_id == event_id,
            |m| m.created_at,
        ))
    }

    async fn delete_event_documents(&self, event_id: EventId) -> Result<u64, ApiError> {
        let mut docs = self.docs.write().await;
        let before = docs.comments.len() + docs.reviews.len() + docs.media.len();
        docs.comments.retain(|c| c.event_id != event_id);
        docs.reviews.retain(|r| r.event_id != event_id);
        docs.media.retain(|m| m.event_id != event_id);
        let after = docs.comments.len() + docs.reviews.len() + docs.media.len();
        Ok((before - after) as u64)
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Key/value cache kept in memory. Expired entries are dropped lazily on
/// the next write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), ApiError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: ttl.map(|t| now + t),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ApiError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        Ok(entries
            .remove(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{NewEvent, Role};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn make_event(organizer: UserId, seats: i32, published: bool) -> Event {
        let Ok(event) = Event::create(
            organizer,
            NewEvent {
                title: "Launch party".to_string(),
                description: None,
                location: "Lisbon".to_string(),
                start_date: Utc::now() + chrono::Duration::days(7),
                end_date: None,
                total_seats: seats,
                price: Decimal::new(2500, 2),
                is_published: published,
            },
        ) else {
            panic!("valid event");
        };
        event
    }

    fn make_purchase(event: &Event, user: UserId, quantity: u32) -> PurchaseRecord {
        let now = Utc::now();
        let tickets: Vec<Ticket> = (0..quantity)
            .map(|_| Ticket::paid(user, event.id, event.price, now))
            .collect();
        let payment = Payment::completed(
            user,
            tickets.first().map(|t| t.id),
            event.price * Decimal::from(quantity),
            "card".to_string(),
            None,
            now,
        );
        PurchaseRecord {
            event_id: event.id,
            quantity,
            tickets,
            payment,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let a = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
            Role::Customer,
            None,
        );
        let b = User::new(
            "Ada 2".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
            Role::Customer,
            None,
        );
        assert!(store.insert_user(&a).await.is_ok());
        let result = store.insert_user(&b).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_only_returns_published_events_in_start_order() {
        let store = MemoryStore::new();
        let organizer = UserId::new();
        let mut later = make_event(organizer, 10, true);
        later.start_date += chrono::Duration::days(10);
        let sooner = make_event(organizer, 10, true);
        let draft = make_event(organizer, 10, false);
        for e in [&later, &sooner, &draft] {
            let _ = store.insert_event(e).await;
        }

        let filter = EventFilter {
            limit: 10,
            ..EventFilter::default()
        };
        let Ok(page) = store.list_published_events(&filter).await else {
            panic!("list failed");
        };
        assert_eq!(page.total, 2);
        let ids: Vec<EventId> = page.events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }

    #[tokio::test]
    async fn list_filters_by_location_and_paginates() {
        let store = MemoryStore::new();
        let organizer = UserId::new();
        for _ in 0..3 {
            let _ = store.insert_event(&make_event(organizer, 5, true)).await;
        }
        let mut elsewhere = make_event(organizer, 5, true);
        elsewhere.location = "Porto".to_string();
        let _ = store.insert_event(&elsewhere).await;

        let filter = EventFilter {
            location: Some("lis".to_string()),
            offset: 2,
            limit: 2,
            ..EventFilter::default()
        };
        let Ok(page) = store.list_published_events(&filter).await else {
            panic!("list failed");
        };
        assert_eq!(page.total, 3);
        assert_eq!(page.events.len(), 1);
    }

    #[tokio::test]
    async fn purchase_decrements_seats_and_stores_tickets() {
        let store = MemoryStore::new();
        let event = make_event(UserId::new(), 5, true);
        let _ = store.insert_event(&event).await;
        let buyer = UserId::new();

        let remaining = store.commit_purchase(&make_purchase(&event, buyer, 3)).await;
        assert_eq!(remaining.ok(), Some(2));

        let Ok(tickets) = store.tickets_for_user(buyer).await else {
            panic!("query failed");
        };
        assert_eq!(tickets.len(), 3);
        let Ok(payments) = store.payments_for_user(buyer).await else {
            panic!("query failed");
        };
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn purchase_beyond_capacity_writes_nothing() {
        let store = MemoryStore::new();
        let event = make_event(UserId::new(), 2, true);
        let _ = store.insert_event(&event).await;
        let buyer = UserId::new();

        let result = store.commit_purchase(&make_purchase(&event, buyer, 3)).await;
        assert!(matches!(
            result,
            Err(ApiError::InsufficientSeats {
                requested: 3,
                available: 2
            })
        ));
        assert!(store.tickets_for_user(buyer).await.unwrap_or_default().is_empty());
        let Ok(Some(stored)) = store.find_event(event.id).await else {
            panic!("event missing");
        };
        assert_eq!(stored.available_seats, 2);
    }

    #[tokio::test]
    async fn cancel_returns_seat_once() {
        let store = MemoryStore::new();
        let event = make_event(UserId::new(), 2, true);
        let _ = store.insert_event(&event).await;
        let buyer = UserId::new();
        let purchase = make_purchase(&event, buyer, 1);
        let Some(ticket_id) = purchase.tickets.first().map(|t| t.id) else {
            panic!("no ticket");
        };
        let _ = store.commit_purchase(&purchase).await;

        let Ok((ticket, remaining)) = store.cancel_ticket(ticket_id).await else {
            panic!("cancel failed");
        };
        assert_eq!(ticket.status, TicketStatus::Cancelled);
        assert_eq!(remaining, 2);

        let again = store.cancel_ticket(ticket_id).await;
        assert!(matches!(again, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_event_shifts_available_by_capacity_delta() {
        let store = MemoryStore::new();
        let event = make_event(UserId::new(), 5, true);
        let _ = store.insert_event(&event).await;
        let _ = store
            .commit_purchase(&make_purchase(&event, UserId::new(), 2))
            .await;

        let mut edited = event.clone();
        edited.total_seats = 8;
        let Ok(updated) = store.update_event(&edited).await else {
            panic!("update failed");
        };
        assert_eq!(updated.available_seats, 6);

        edited.total_seats = 1;
        let rejected = store.update_event(&edited).await;
        assert!(matches!(rejected, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn delete_event_removes_its_tickets() {
        let store = MemoryStore::new();
        let event = make_event(UserId::new(), 5, true);
        let _ = store.insert_event(&event).await;
        let buyer = UserId::new();
        let _ = store.commit_purchase(&make_purchase(&event, buyer, 1)).await;

        assert_eq!(store.delete_event(event.id).await.ok(), Some(true));
        assert_eq!(store.delete_event(event.id).await.ok(), Some(false));
        assert!(store.tickets_for_user(buyer).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn one_review_per_user_per_event() {
        let docs = MemoryDocumentStore::new();
        let review = Review {
            id: crate::domain::community::new_document_id(),
            event_id: EventId::new(),
            user_id: UserId::new(),
            user_name: "Ada".to_string(),
            rating: 5,
            title: None,
            text: "Great".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        assert!(docs.insert_review(&review).await.is_ok());
        let mut second = review.clone();
        second.id = crate::domain::community::new_document_id();
        assert!(matches!(
            docs.insert_review(&second).await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        let _ = cache
            .set("hold", "1", Some(Duration::from_secs(600)))
            .await;
        let _ = cache.set("forever", "2", None).await;
        assert_eq!(cache.get("hold").await.ok().flatten().as_deref(), Some("1"));

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(cache.get("hold").await.ok().flatten(), None);
        assert_eq!(
            cache.get("forever").await.ok().flatten().as_deref(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn cache_delete_ignores_missing_keys() {
        let cache = MemoryCache::new();
        let _ = cache.set("a", "1", None).await;
        let result = cache
            .delete(&["a".to_string(), "missing".to_string()])
            .await;
        assert!(result.is_ok());
        assert_eq!(cache.get("a").await.ok().flatten(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_take_hands_a_value_out_once() {
        let cache = MemoryCache::new();
        let _ = cache.set("hold", "1", Some(Duration::from_secs(60))).await;
        assert_eq!(cache.take("hold").await.ok().flatten().as_deref(), Some("1"));
        assert_eq!(cache.take("hold").await.ok().flatten(), None);
        assert_eq!(cache.get("hold").await.ok().flatten(), None);

        let _ = cache.set("stale", "2", Some(Duration::from_secs(60))).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.take("stale").await.ok().flatten(), None);
    }

    #[tokio::test]
    async fn location_filter_matches_wildcard_characters_literally() {
        let store = MemoryStore::new();
        let organizer = UserId::new();
        let mut percent = make_event(organizer, 5, true);
        percent.location = "100% Arena".to_string();
        let _ = store.insert_event(&percent).await;
        let _ = store.insert_event(&make_event(organizer, 5, true)).await;

        for (needle, expected) in [("%", 1), ("_", 0), ("0% a", 1)] {
            let filter = EventFilter {
                location: Some(needle.to_string()),
                limit: 10,
                ..EventFilter::default()
            };
            let Ok(page) = store.list_published_events(&filter).await else {
                panic!("list failed");
            };
            assert_eq!(page.total, expected, "location filter {needle:?}");
        }
    }
}
