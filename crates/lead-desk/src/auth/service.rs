use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::tokens::{TokenDigest, TokenIssuer, TokenKind, TokenRepository};
use crate::access::{Actor, Role};
use crate::staff::{
    PasswordHashError, StaffAccount, StaffDirectory, StaffIdentity, StaffInput, StaffRepository,
    StaffServiceError,
};
use crate::store::RepositoryError;
use crate::validation::{FieldErrors, NON_FIELD_ERRORS};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const ACCOUNT_DISABLED: &str = "User account is disabled";
pub const INVALID_TOKEN: &str = "Given token not valid for any token type";

/// Self-service registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Tokens handed out by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginGrant {
    pub access: String,
    pub refresh: String,
    pub user: StaffIdentity,
}

/// Identity provider: registration, credential login, and bearer-token
/// resolution for the HTTP surface.
pub struct AuthService<R> {
    repository: Arc<R>,
    staff: Arc<StaffDirectory<R>>,
    issuer: TokenIssuer,
}

impl<R> AuthService<R>
where
    R: StaffRepository + TokenRepository + 'static,
{
    pub fn new(repository: Arc<R>, staff: Arc<StaffDirectory<R>>, issuer: TokenIssuer) -> Self {
        Self {
            repository,
            staff,
            issuer,
        }
    }

    /// Public sign-up. The `ADMIN` role cannot be self-assigned.
    pub fn register(&self, registration: Registration) -> Result<StaffAccount, AuthError> {
        if registration.role == Role::Admin {
            return Err(FieldErrors::single(
                "role",
                "The ADMIN role cannot be chosen at registration.",
            )
            .into());
        }
        let account = self.staff.provision(
            StaffInput {
                username: registration.username,
                password: Some(registration.password),
                first_name: registration.first_name,
                last_name: registration.last_name,
                email: registration.email,
                phone: String::new(),
                role: registration.role,
                team: String::new(),
                is_active: true,
            },
            false,
        )?;
        info!(staff = %account.id, role = %account.role, "staff account registered");
        Ok(account)
    }

    /// Exchange credentials for an access and refresh token pair.
    pub fn login(&self, credentials: Credentials) -> Result<LoginGrant, AuthError> {
        let account = self
            .staff
            .verify_credentials(&credentials.username, &credentials.password)?
            .ok_or_else(|| FieldErrors::single(NON_FIELD_ERRORS, INVALID_CREDENTIALS))?;
        if !account.is_active {
            warn!(staff = %account.id, "login refused for disabled account");
            return Err(FieldErrors::single(NON_FIELD_ERRORS, ACCOUNT_DISABLED).into());
        }

        let now = Utc::now();
        let purged = self.repository.purge_expired_tokens(now)?;
        if purged > 0 {
            debug!(purged, "expired tokens purged");
        }

        let access = self.issuer.issue(account.id, TokenKind::Access, now);
        let refresh = self.issuer.issue(account.id, TokenKind::Refresh, now);
        self.repository.store_token(access.digest, access.grant)?;
        self.repository.store_token(refresh.digest, refresh.grant)?;
        let account = self.staff.record_login(account.id, now)?;

        info!(staff = %account.id, username = %account.username, "login succeeded");
        Ok(LoginGrant {
            access: access.secret,
            refresh: refresh.secret,
            user: StaffIdentity::from(&account),
        })
    }

    /// Mint a new access token from a live refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let account = self.resolve(refresh_token, TokenKind::Refresh)?;
        let access = self.issuer.issue(account.id, TokenKind::Access, now);
        self.repository.store_token(access.digest, access.grant)?;
        debug!(staff = %account.id, "access token refreshed");
        Ok(access.secret)
    }

    /// Resolve a bearer access token to the acting identity.
    pub fn authenticate(&self, access_token: &str) -> Result<Actor, AuthError> {
        self.resolve(access_token, TokenKind::Access)
            .map(|account| account.actor())
    }

    fn resolve(&self, token: &str, kind: TokenKind) -> Result<StaffAccount, AuthError> {
        let now = Utc::now();
        let grant = self
            .repository
            .find_token(&TokenDigest::of(token))?
            .filter(|grant| grant.permits(kind, now))
            .ok_or(AuthError::Unauthorized(INVALID_TOKEN))?;
        let account = self
            .repository
            .fetch_staff(grant.owner)?
            .ok_or(AuthError::Unauthorized("User not found"))?;
        if !account.is_active {
            return Err(AuthError::Unauthorized("User is inactive"));
        }
        Ok(account)
    }
}

/// Error raised by the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Hashing(#[from] PasswordHashError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AuthError {
    fn from(error: RepositoryError) -> Self {
        Self::Repository(error)
    }
}

impl From<StaffServiceError> for AuthError {
    fn from(error: StaffServiceError) -> Self {
        match error {
            StaffServiceError::Validation(errors) => Self::Validation(errors),
            StaffServiceError::Repository(error) => Self::Repository(error),
            StaffServiceError::Hashing(error) => Self::Hashing(error),
            StaffServiceError::NotFound => Self::Unauthorized("User not found"),
            StaffServiceError::Forbidden(_) => Self::Unauthorized(INVALID_TOKEN),
        }
    }
}
