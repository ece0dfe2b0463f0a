//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::persistence::Stores;
use crate::service::{CommunityService, EventService, TicketService, UserService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Token verification for the auth extractors.
    pub tokens: TokenIssuer,
    /// Accounts.
    pub users: Arc<UserService>,
    /// Event listings.
    pub events: Arc<EventService>,
    /// Reservations, purchases and cancellations.
    pub tickets: Arc<TicketService>,
    /// Comments, reviews and media.
    pub community: Arc<CommunityService>,
}

impl AppState {
    /// Wires every service over `stores`.
    #[must_use]
    pub fn new(config: &AppConfig, stores: Stores) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_ttl_hours);

        let users = Arc::new(UserService::new(
            Arc::clone(&stores.users),
            tokens.clone(),
            config.bcrypt_cost,
        ));
        let events = Arc::new(EventService::new(
            Arc::clone(&stores.events),
            Arc::clone(&stores.documents),
            Arc::clone(&stores.cache),
        ));
        let tickets = Arc::new(TicketService::new(
            Arc::clone(&events),
            Arc::clone(&stores.events),
            Arc::clone(&stores.tickets),
            Arc::clone(&stores.cache),
            Duration::from_secs(config.reservation_ttl_secs),
        ));
        let community = Arc::new(CommunityService::new(
            stores.events,
            stores.users,
            stores.documents,
            config.upload_dir.clone(),
        ));

        Self {
            tokens,
            users,
            events,
            tickets,
            community,
        }
    }
}
