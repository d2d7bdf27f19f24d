//! Plain data records for the grant negotiation domain.

pub mod access;
pub mod client;
pub mod grant;
pub mod id;
pub mod interaction;
pub mod key;
pub mod secret;
pub mod token;

pub use access::*;
pub use client::*;
pub use grant::*;
pub use id::*;
pub use interaction::*;
pub use key::*;
pub use secret::*;
pub use token::*;
