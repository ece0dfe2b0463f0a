//! OpenAPI document covering every REST endpoint.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto;
use super::handlers::{auth, community, events, system, tickets};
use crate::domain;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Event Management System API",
        description = "Event listings, seat reservations, ticket purchases, reviews and media."
    ),
    paths(
        system::root_handler,
        system::health_handler,
        auth::register,
        auth::login,
        auth::get_profile,
        auth::update_profile,
        events::list_events,
        events::create_event,
        events::get_event,
        events::update_event,
        events::delete_event,
        events::event_seats,
        community::list_comments,
        community::add_comment,
        community::list_event_reviews,
        community::add_review,
        community::list_reviews,
        community::get_review,
        community::update_review,
        community::delete_review,
        community::list_media,
        community::upload_media,
        tickets::reserve,
        tickets::purchase,
        tickets::my_tickets,
        tickets::my_payments,
        tickets::cancel_ticket,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        domain::Event,
        domain::Ticket,
        domain::TicketStatus,
        domain::Payment,
        domain::PaymentStatus,
        domain::Comment,
        domain::Review,
        domain::Media,
        domain::MediaKind,
        domain::Role,
        dto::PaginationMeta,
        dto::MessageResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Banner and health"),
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Events", description = "Event listings"),
        (name = "Tickets", description = "Reservations, purchases and cancellations"),
        (name = "Community", description = "Comments, reviews and media"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_ticketing_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/tickets/reserve"));
        assert!(doc.paths.paths.contains_key("/api/events/{id}/media"));
        assert!(doc.paths.paths.contains_key("/health"));
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let has_bearer = doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer"));
        assert!(has_bearer);
    }
}
