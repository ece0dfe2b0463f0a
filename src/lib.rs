//! # ticketing-gateway
//!
//! REST backend for an event management platform: organizers publish
//! events, customers hold seats for a few minutes and pay for them, and
//! everyone can comment, review and browse uploaded media.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers + auth extractors (api/, auth/)
//!     │
//!     ├── UserService / EventService / TicketService / CommunityService
//!     │
//!     ├── PostgreSQL   users, events, tickets, payments
//!     ├── MongoDB      comments, reviews, media
//!     └── Redis        event cache, seat counters, reservation holds
//! ```
//!
//! Seats are only ever taken inside the purchase transaction, guarded by
//! `available_seats >= quantity`, so concurrent buyers cannot oversell an
//! event. Reservation holds live in the cache with a TTL and never touch
//! the relational store.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
