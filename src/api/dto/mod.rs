//! Data Transfer Objects for REST request/response serialization.
//!
//! JSON field names are camelCase. Money amounts are serialized as decimal
//! strings so that clients never see a rounded float.

pub mod auth_dto;
pub mod common_dto;
pub mod community_dto;
pub mod event_dto;
pub mod ticket_dto;

pub use auth_dto::*;
pub use common_dto::*;
pub use community_dto::*;
pub use event_dto::*;
pub use ticket_dto::*;
