//! Event listings and their seat inventory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, UserId};
use crate::error::ApiError;

/// An event listing as stored in the relational store and cached as JSON.
///
/// `available_seats` never exceeds `total_seats` and never goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Organizer who owns the listing.
    pub organizer_id: UserId,
    /// Title shown in listings.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// Venue or address.
    pub location: String,
    /// Start of the event.
    pub start_date: DateTime<Utc>,
    /// Optional end of the event.
    pub end_date: Option<DateTime<Utc>>,
    /// Seat capacity.
    pub total_seats: i32,
    /// Seats not yet sold.
    pub available_seats: i32,
    /// Price of a single ticket.
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    /// Whether the event appears in public listings.
    pub is_published: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Venue.
    pub location: String,
    /// Start date.
    pub start_date: DateTime<Utc>,
    /// End date.
    pub end_date: Option<DateTime<Utc>>,
    /// Capacity.
    pub total_seats: i32,
    /// Ticket price.
    pub price: Decimal,
    /// Publish immediately.
    pub is_published: bool,
}

/// Partial update of an event. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New venue.
    pub location: Option<String>,
    /// New start date.
    pub start_date: Option<DateTime<Utc>>,
    /// New end date.
    pub end_date: Option<DateTime<Utc>>,
    /// New capacity; shifts `available_seats` by the same delta.
    pub total_seats: Option<i32>,
    /// New price.
    pub price: Option<Decimal>,
    /// New publish state.
    pub is_published: Option<bool>,
}

impl Event {
    /// Creates a listing owned by `organizer_id` with every seat available.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if any field is invalid.
    pub fn create(organizer_id: UserId, new: NewEvent) -> Result<Self, ApiError> {
        validate_title(&new.title)?;
        validate_location(&new.location)?;
        validate_seats(new.total_seats)?;
        validate_price(new.price)?;
        validate_dates(new.start_date, new.end_date)?;

        let now = Utc::now();
        Ok(Self {
            id: EventId::new(),
            organizer_id,
            title: new.title.trim().to_string(),
            description: new.description,
            location: new.location.trim().to_string(),
            start_date: new.start_date,
            end_date: new.end_date,
            total_seats: new.total_seats,
            available_seats: new.total_seats,
            price: new.price.round_dp(2),
            is_published: new.is_published,
            created_at: now,
            updated_at: now,
        })
    }

    /// Number of seats already sold.
    #[must_use]
    pub const fn sold_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    /// Whether the event start lies at or before `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now
    }

    /// Applies a partial update in place.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if a new value is invalid or the
    /// new capacity is below the number of seats already sold.
    pub fn apply(&mut self, changes: EventChanges) -> Result<(), ApiError> {
        if let Some(title) = changes.title {
            validate_title(&title)?;
            self.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
        if let Some(location) = changes.location {
            validate_location(&location)?;
            self.location = location.trim().to_string();
        }
        if let Some(start) = changes.start_date {
            self.start_date = start;
        }
        if let Some(end) = changes.end_date {
            self.end_date = Some(end);
        }
        validate_dates(self.start_date, self.end_date)?;
        if let Some(price) = changes.price {
            validate_price(price)?;
            self.price = price.round_dp(2);
        }
        if let Some(total) = changes.total_seats {
            validate_seats(total)?;
            let sold = self.sold_seats();
            if total < sold {
                return Err(ApiError::InvalidRequest(format!(
                    "totalSeats cannot be lower than the {sold} seats already sold"
                )));
            }
            self.total_seats = total;
            self.available_seats = total - sold;
        }
        if let Some(published) = changes.is_published {
            self.is_published = published;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let len = title.trim().chars().count();
    if len == 0 || len > 200 {
        return Err(ApiError::InvalidRequest(
            "title must be between 1 and 200 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_location(location: &str) -> Result<(), ApiError> {
    if location.trim().is_empty() {
        return Err(ApiError::InvalidRequest("location is required".to_string()));
    }
    Ok(())
}

fn validate_seats(total: i32) -> Result<(), ApiError> {
    if total <= 0 {
        return Err(ApiError::InvalidRequest(
            "totalSeats must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() {
        return Err(ApiError::InvalidRequest(
            "price must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_dates(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<(), ApiError> {
    if let Some(end) = end
        && end < start
    {
        return Err(ApiError::InvalidRequest(
            "endDate must not be before startDate".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_event(total_seats: i32) -> NewEvent {
        NewEvent {
            title: "  RustConf  ".to_string(),
            description: None,
            location: "Montreal".to_string(),
            start_date: Utc::now() + Duration::days(30),
            end_date: None,
            total_seats,
            price: Decimal::new(4999, 2),
            is_published: true,
        }
    }

    #[test]
    fn create_sets_all_seats_available() {
        let Ok(event) = Event::create(UserId::new(), new_event(100)) else {
            panic!("valid event");
        };
        assert_eq!(event.total_seats, 100);
        assert_eq!(event.available_seats, 100);
        assert_eq!(event.title, "RustConf");
        assert_eq!(event.sold_seats(), 0);
    }

    #[test]
    fn create_rejects_invalid_fields() {
        assert!(Event::create(UserId::new(), new_event(0)).is_err());

        let mut negative_price = new_event(10);
        negative_price.price = Decimal::new(-1, 0);
        assert!(Event::create(UserId::new(), negative_price).is_err());

        let mut ends_early = new_event(10);
        ends_early.end_date = Some(ends_early.start_date - Duration::hours(1));
        assert!(Event::create(UserId::new(), ends_early).is_err());
    }

    #[test]
    fn growing_capacity_adds_available_seats() {
        let Ok(mut event) = Event::create(UserId::new(), new_event(10)) else {
            panic!("valid event");
        };
        event.available_seats = 4;
        let changes = EventChanges {
            total_seats: Some(20),
            ..EventChanges::default()
        };
        assert!(event.apply(changes).is_ok());
        assert_eq!(event.total_seats, 20);
        assert_eq!(event.available_seats, 14);
    }

    #[test]
    fn shrinking_below_sold_seats_is_rejected() {
        let Ok(mut event) = Event::create(UserId::new(), new_event(10)) else {
            panic!("valid event");
        };
        event.available_seats = 2;
        let changes = EventChanges {
            total_seats: Some(5),
            ..EventChanges::default()
        };
        assert!(event.apply(changes).is_err());
        assert_eq!(event.total_seats, 10);
    }

    #[test]
    fn has_started_compares_start_date() {
        let Ok(mut event) = Event::create(UserId::new(), new_event(10)) else {
            panic!("valid event");
        };
        assert!(!event.has_started(Utc::now()));
        event.start_date = Utc::now() - Duration::minutes(1);
        assert!(event.has_started(Utc::now()));
    }

    #[test]
    fn serializes_camel_case_with_string_price() {
        let Ok(event) = Event::create(UserId::new(), new_event(10)) else {
            panic!("valid event");
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["availableSeats"], 10);
        assert_eq!(json["price"], "49.99");
        assert!(json.get("organizerId").is_some());
    }
}
