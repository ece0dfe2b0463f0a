//! Event DTOs for listing, create and update operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PageWindow, PaginationMeta};
use crate::domain::{Event, EventChanges, EventId, NewEvent, UserId};
use crate::persistence::EventFilter;

/// Query string of `GET /api/events`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventListQuery {
    /// Page number (1-indexed). Defaults to 1.
    pub page: Option<u32>,
    /// Items per page, 1 to 100. Defaults to 20.
    pub per_page: Option<u32>,
    /// Only events of this organizer.
    #[param(value_type = Option<String>, format = Uuid)]
    pub organizer_id: Option<UserId>,
    /// Case-insensitive substring of the venue.
    pub location: Option<String>,
    /// Only events starting at or after this instant (RFC 3339).
    pub starts_after: Option<DateTime<Utc>>,
}

impl EventListQuery {
    /// Splits the query into the normalized page window and store filter.
    #[must_use]
    pub fn into_filter(self) -> (PageWindow, EventFilter) {
        let window = PageWindow::clamped(self.page, self.per_page);
        let filter = EventFilter {
            organizer_id: self.organizer_id,
            location: self
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            starts_after: self.starts_after,
            offset: window.offset(),
            limit: window.per_page,
        };
        (window, filter)
    }
}

/// Paginated list response for `GET /api/events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page.
    pub data: Vec<Event>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /api/events`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Title, 1 to 200 characters.
    pub title: String,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Venue.
    pub location: String,
    /// Start of the event.
    pub start_date: DateTime<Utc>,
    /// Optional end of the event.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Seat capacity.
    pub total_seats: i32,
    /// Unit price as a decimal string or number.
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    /// List publicly right away. Defaults to `false`.
    #[serde(default)]
    pub is_published: bool,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            location: req.location,
            start_date: req.start_date,
            end_date: req.end_date,
            total_seats: req.total_seats,
            price: req.price,
            is_published: req.is_published,
        }
    }
}

/// Request body for `PUT /api/events/{id}`. Absent fields are unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New venue.
    #[serde(default)]
    pub location: Option<String>,
    /// New start.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// New end.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// New capacity.
    #[serde(default)]
    pub total_seats: Option<i32>,
    /// New unit price.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "59.99")]
    pub price: Option<Decimal>,
    /// New publish state.
    #[serde(default)]
    pub is_published: Option<bool>,
}

impl From<UpdateEventRequest> for EventChanges {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            location: req.location,
            start_date: req.start_date,
            end_date: req.end_date,
            total_seats: req.total_seats,
            price: req.price,
            is_published: req.is_published,
        }
    }
}

/// Response body for `GET /api/events/{id}/seats`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatsResponse {
    /// Event id.
    pub event_id: EventId,
    /// Seats not yet sold.
    pub available_seats: i32,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn query_maps_to_filter_window() {
        let query = EventListQuery {
            page: Some(2),
            per_page: Some(5),
            location: Some("  ".to_string()),
            ..EventListQuery::default()
        };
        let (window, filter) = query.into_filter();
        assert_eq!(window.page, 2);
        assert_eq!(filter.offset, 5);
        assert_eq!(filter.limit, 5);
        assert!(filter.location.is_none());
    }

    #[test]
    fn create_request_defaults_to_unpublished() {
        let body = r#"{
            "title": "Launch",
            "location": "Lisbon",
            "startDate": "2030-05-01T18:00:00Z",
            "totalSeats": 80,
            "price": "12.50"
        }"#;
        let Ok(req) = serde_json::from_str::<CreateEventRequest>(body) else {
            panic!("body should parse");
        };
        assert!(!req.is_published);
        assert_eq!(req.price, Decimal::new(1250, 2));
    }
}
