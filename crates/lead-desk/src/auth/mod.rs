//! Identity provider: registration, login, and opaque bearer tokens.

pub mod router;
pub mod service;
pub mod tokens;

#[cfg(test)]
mod tests;

pub use router::auth_routes;
pub use service::{AuthError, AuthService, Credentials, LoginGrant, Registration};
pub use tokens::{TokenDigest, TokenGrant, TokenIssuer, TokenKind, TokenRepository};
