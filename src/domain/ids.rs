//! Type-safe entity identifiers.
//!
//! Every relational entity is keyed by a UUID v4. Each gets its own
//! newtype so that, for example, a [`UserId`] can never be passed where an
//! [`EventId`] is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        #[schema(value_type = String, format = Uuid)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered user.
    UserId
);
entity_id!(
    /// Identifier of an event listing.
    EventId
);
entity_id!(
    /// Identifier of an issued ticket.
    TicketId
);
entity_id!(
    /// Identifier of a payment record.
    PaymentId
);
entity_id!(
    /// Identifier of a reservation hold living in the cache.
    ReservationId
);

/// Returns the first `len` hex characters of a fresh UUID v4, upper-cased.
///
/// Used for human-facing references such as `TIX-1A2B3C4D`.
#[must_use]
pub fn short_reference(len: usize) -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    simple.chars().take(len).collect::<String>().to_uppercase()
}
