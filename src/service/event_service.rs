//! Event service: listings, read-through caching and seat counters.

use std::sync::Arc;

use crate::auth::AuthUser;
use crate::domain::{Event, EventChanges, EventId, NewEvent};
use crate::error::ApiError;
use crate::persistence::{CacheStore, DocumentStore, EventFilter, EventPage, EventStore, keys};

/// Event orchestration over the relational store, the document store and
/// the cache.
///
/// The relational store is the system of record. `event:{id}` holds a JSON
/// copy of the row and `event:{id}:seats` the available-seat counter; both
/// are filled lazily on read and rewritten or dropped on every write path
/// that changes them.
#[derive(Debug, Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    documents: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheStore>,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        documents: Arc<dyn DocumentStore>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            events,
            documents,
            cache,
        }
    }

    /// Lists published events.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, filter: &EventFilter) -> Result<EventPage, ApiError> {
        self.events.list_published_events(filter).await
    }

    /// Loads an event, serving it from the cache when possible.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] for an unknown id.
    pub async fn get(&self, id: EventId) -> Result<Event, ApiError> {
        let key = keys::event(id);
        if let Some(cached) = self.cache.get(&key).await? {
            match serde_json::from_str::<Event>(&cached) {
                Ok(event) => return Ok(event),
                Err(e) => tracing::warn!(%id, error = %e, "discarding unreadable cached event"),
            }
        }

        let event = self
            .events
            .find_event(id)
            .await?
            .ok_or(ApiError::EventNotFound(*id.as_uuid()))?;
        self.cache_event(&event).await?;
        Ok(event)
    }

    /// Creates an event owned by `organizer` with every seat available.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] on bad fields.
    pub async fn create(&self, organizer: &AuthUser, new: NewEvent) -> Result<Event, ApiError> {
        let event = Event::create(organizer.id, new)?;
        self.events.insert_event(&event).await?;
        self.cache_event(&event).await?;
        tracing::info!(event_id = %event.id, organizer_id = %organizer.id, "event created");
        Ok(event)
    }

    /// Applies a partial update on behalf of the owner or an admin.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`], [`ApiError::Forbidden`] for anyone else's
    /// event, [`ApiError::InvalidRequest`] on bad fields or a capacity below
    /// the seats already sold.
    pub async fn update(
        &self,
        id: EventId,
        caller: &AuthUser,
        changes: EventChanges,
    ) -> Result<Event, ApiError> {
        let mut event = self.owned_event(id, caller).await?;
        event.apply(changes)?;
        let stored = self.events.update_event(&event).await?;

        self.cache_event(&stored).await?;
        self.cache.delete(&[keys::event_seats(id)]).await?;
        tracing::info!(event_id = %id, "event updated");
        Ok(stored)
    }

    /// Deletes an event with its documents and cache keys. Its tickets go
    /// with the row.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] or [`ApiError::Forbidden`].
    pub async fn delete(&self, id: EventId, caller: &AuthUser) -> Result<(), ApiError> {
        self.owned_event(id, caller).await?;

        let documents = self.documents.delete_event_documents(id).await?;
        self.cache
            .delete(&[
                keys::event(id),
                keys::event_seats(id),
                keys::event_temp_seats(id),
            ])
            .await?;
        if !self.events.delete_event(id).await? {
            return Err(ApiError::EventNotFound(*id.as_uuid()));
        }

        tracing::info!(event_id = %id, documents, "event deleted");
        Ok(())
    }

    /// Returns the available-seat counter, serving it from the cache when
    /// possible.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] for an unknown id.
    pub async fn available_seats(&self, id: EventId) -> Result<i32, ApiError> {
        let key = keys::event_seats(id);
        if let Some(cached) = self.cache.get(&key).await?
            && let Ok(seats) = cached.parse::<i32>()
        {
            return Ok(seats);
        }

        let event = self
            .events
            .find_event(id)
            .await?
            .ok_or(ApiError::EventNotFound(*id.as_uuid()))?;
        self.cache
            .set(&key, &event.available_seats.to_string(), None)
            .await?;
        Ok(event.available_seats)
    }

    /// Records a new seat count after a sale or cancellation: the counter
    /// is rewritten and the cached event copy dropped.
    ///
    /// # Errors
    ///
    /// Propagates cache failures.
    pub async fn record_seats(&self, id: EventId, available: i32) -> Result<(), ApiError> {
        self.cache
            .set(&keys::event_seats(id), &available.to_string(), None)
            .await?;
        self.cache.delete(&[keys::event(id)]).await
    }

    async fn owned_event(&self, id: EventId, caller: &AuthUser) -> Result<Event, ApiError> {
        let event = self
            .events
            .find_event(id)
            .await?
            .ok_or(ApiError::EventNotFound(*id.as_uuid()))?;
        if !caller.can_manage(event.organizer_id) {
            return Err(ApiError::Forbidden(
                "you are not the organizer of this event".to_string(),
            ));
        }
        Ok(event)
    }

    async fn cache_event(&self, event: &Event) -> Result<(), ApiError> {
        let json = serde_json::to_string(event)
            .map_err(|e| ApiError::Internal(format!("event serialization failed: {e}")))?;
        self.cache.set(&keys::event(event.id), &json, None).await
    }
}
