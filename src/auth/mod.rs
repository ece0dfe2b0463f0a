//! Authentication: password hashing, access tokens and the request
//! extractors that turn a bearer token into an [`AuthUser`].

pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::{AuthUser, OrganizerUser};
pub use token::{Claims, TokenIssuer};
