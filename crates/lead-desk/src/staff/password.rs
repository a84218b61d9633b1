//! Argon2id password hashes in PHC string form.
//!
//! Cost parameters travel inside the stored string, so raising the configured
//! cost only affects newly set passwords.

use std::fmt;

use argon2::password_hash::{self, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

const SALT_BYTES: usize = 16;
/// Argon2id memory cost in KiB for new hashes.
pub const DEFAULT_MEMORY_KIB: u32 = 19_456;
/// Argon2id pass count for new hashes.
pub const DEFAULT_PASSES: u32 = 2;

/// Encoded password hash. `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts an already encoded Argon2id hash, e.g. one produced by
    /// `hash-password`.
    pub fn parse(encoded: &str) -> Option<Self> {
        let parsed = password_hash::PasswordHash::new(encoded).ok()?;
        (parsed.algorithm == Algorithm::Argon2id.ident()).then(|| Self(encoded.to_string()))
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Raised when the KDF rejects its inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

impl From<password_hash::Error> for PasswordHashError {
    fn from(error: password_hash::Error) -> Self {
        Self(error.to_string())
    }
}

/// One-way hashing primitive used for every stored password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    memory_kib: u32,
    passes: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_KIB, DEFAULT_PASSES)
    }
}

impl PasswordHasher {
    /// Costs below the Argon2 minimums are raised to them.
    pub fn new(memory_kib: u32, passes: u32) -> Self {
        Self {
            memory_kib: memory_kib.max(Params::MIN_M_COST),
            passes: passes.max(Params::MIN_T_COST),
        }
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHashError> {
        let mut salt = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt);
        self.hash_with_salt(password, &salt)
    }

    pub fn hash_with_salt(
        &self,
        password: &str,
        salt: &[u8],
    ) -> Result<PasswordHash, PasswordHashError> {
        let salt = SaltString::encode_b64(salt)?;
        let encoded = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)?
            .to_string();
        Ok(PasswordHash(encoded))
    }

    /// Verifies with the parameters recorded in `hash`. Malformed hashes never
    /// verify.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        let Ok(parsed) = password_hash::PasswordHash::new(hash.as_str()) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordHashError> {
        let params = Params::new(self.memory_kib, self.passes, 1, None)
            .map_err(|error| PasswordHashError(error.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}
