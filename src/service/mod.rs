//! Service layer: business rules between the HTTP handlers and the
//! stores.
//!
//! Each service owns `Arc` handles to the store traits it needs and turns
//! store results into domain values or a typed [`crate::error::ApiError`].

pub mod community_service;
pub mod event_service;
pub mod ticket_service;
pub mod user_service;

pub use community_service::CommunityService;
pub use event_service::EventService;
pub use ticket_service::TicketService;
pub use user_service::UserService;
