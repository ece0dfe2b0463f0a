//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod community;
pub mod events;
pub mod system;
pub mod tickets;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(community::routes())
        .merge(tickets::routes())
}
