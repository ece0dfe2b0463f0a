//! Domain layer: entity identifiers and the records held by the three
//! stores.
//!
//! Relational records (users, events, tickets, payments), document records
//! (comments, reviews, media) and the cache-only reservation hold all live
//! here, free of any storage concerns.

pub mod community;
pub mod event;
pub mod ids;
pub mod reservation;
pub mod ticket;
pub mod user;

pub use community::{Comment, Media, MediaKind, Review};
pub use event::{Event, EventChanges, NewEvent};
pub use ids::{EventId, PaymentId, ReservationId, TicketId, UserId};
pub use reservation::Reservation;
pub use ticket::{Payment, PaymentStatus, Ticket, TicketStatus};
pub use user::{Role, User};
