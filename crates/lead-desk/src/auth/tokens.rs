//! Opaque bearer tokens.
//!
//! Tokens are random URL-safe strings handed to the client once. The store
//! keeps only their SHA-256 digest next to the owner, kind, and expiry.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::staff::StaffId;
use crate::store::RepositoryError;

pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Authenticates API calls.
    Access,
    /// Only exchangeable for a new access token.
    Refresh,
}

/// SHA-256 of a token string; the lookup key in token storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenDigest([u8; 32]);

impl TokenDigest {
    pub fn of(token: &str) -> Self {
        Self(Sha256::digest(token.as_bytes()).into())
    }
}

/// What a stored token grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub owner: StaffId,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl TokenGrant {
    pub fn permits(&self, kind: TokenKind, now: DateTime<Utc>) -> bool {
        self.kind == kind && self.expires_at > now
    }
}

pub trait TokenRepository: Send + Sync {
    fn store_token(&self, digest: TokenDigest, grant: TokenGrant) -> Result<(), RepositoryError>;

    fn find_token(&self, digest: &TokenDigest) -> Result<Option<TokenGrant>, RepositoryError>;

    /// Drops grants expired at `now`; returns how many were removed.
    fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

/// Freshly minted token: the secret for the client plus what to store.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub secret: String,
    pub digest: TokenDigest,
    pub grant: TokenGrant,
}

/// Mints access and refresh tokens with configured lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct TokenIssuer {
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(&self, owner: StaffId, kind: TokenKind, now: DateTime<Utc>) -> IssuedToken {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let secret = generate_token(&mut OsRng, TOKEN_BYTES);
        IssuedToken {
            digest: TokenDigest::of(&secret),
            secret,
            grant: TokenGrant {
                owner,
                kind,
                expires_at: now + ttl,
            },
        }
    }
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new(Duration::hours(1), Duration::days(1))
    }
}

/// Random bytes encoded as URL-safe base64 without padding.
pub fn generate_token<R: RngCore>(rng: &mut R, nbytes: usize) -> String {
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}
