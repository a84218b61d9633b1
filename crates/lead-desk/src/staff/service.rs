use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    NewStaff, StaffAccount, StaffId, StaffInput, StaffPatch, StaffQuery, StaffSummary,
};
use super::password::{PasswordHash, PasswordHashError, PasswordHasher};
use super::repository::StaffRepository;
use crate::access::{authorize, AccessDenied, Actor, Operation, Role};
use crate::store::{Page, RepositoryError};
use crate::validation::{is_plausible_email, FieldErrors};

pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 6;

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Staff directory: account CRUD with hashed credentials.
pub struct StaffDirectory<R> {
    repository: Arc<R>,
    hasher: PasswordHasher,
}

impl<R> StaffDirectory<R>
where
    R: StaffRepository + 'static,
{
    pub fn new(repository: Arc<R>, hasher: PasswordHasher) -> Self {
        Self { repository, hasher }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Active accounts only.
    pub fn list(
        &self,
        query: &StaffQuery,
        actor: &Actor,
    ) -> Result<Page<StaffSummary>, StaffServiceError> {
        authorize(actor, Operation::ManageStaff)?;
        let page = self.repository.list_staff(query)?;
        Ok(page.map(|account| StaffSummary::from(&account)))
    }

    pub fn get(&self, id: StaffId, actor: &Actor) -> Result<StaffAccount, StaffServiceError> {
        authorize(actor, Operation::ManageStaff)?;
        self.repository
            .fetch_staff(id)?
            .ok_or(StaffServiceError::NotFound)
    }

    pub fn create(
        &self,
        input: StaffInput,
        actor: &Actor,
    ) -> Result<StaffAccount, StaffServiceError> {
        authorize(actor, Operation::ManageStaff)?;
        let account = self.provision(input, false)?;
        info!(staff = %account.id, actor = %actor.username, "staff account created");
        Ok(account)
    }

    /// Partial update. The password is rehashed only when one is supplied.
    pub fn update(
        &self,
        id: StaffId,
        patch: StaffPatch,
        actor: &Actor,
    ) -> Result<StaffAccount, StaffServiceError> {
        authorize(actor, Operation::ManageStaff)?;

        let mut errors = FieldErrors::new();
        if let Some(username) = patch.username.as_deref() {
            check_username(username, &mut errors);
        }
        if let Some(password) = patch.password.as_deref() {
            check_password(password, &mut errors);
        }
        if let Some(email) = patch.email.as_deref() {
            check_email(email, &mut errors);
        }
        if let Some(username) = patch.username.as_deref().map(str::trim) {
            if !errors.contains("username") {
                let clash = self.repository.find_staff_by_username(username)?;
                if clash.is_some_and(|account| account.id != id) {
                    errors.add("username", USERNAME_TAKEN);
                }
            }
        }
        errors.into_result()?;

        let password_hash = patch
            .password
            .as_deref()
            .map(|raw| self.hasher.hash(raw))
            .transpose()?;
        let account = self.repository.update_staff(id, |account| {
            apply_patch(account, patch, password_hash);
            Ok::<(), StaffServiceError>(())
        })?;
        info!(staff = %account.id, actor = %actor.username, "staff account updated");
        Ok(account)
    }

    pub fn delete(&self, id: StaffId, actor: &Actor) -> Result<(), StaffServiceError> {
        authorize(actor, Operation::ManageStaff)?;
        self.repository.delete_staff(id)?;
        info!(staff = %id, actor = %actor.username, "staff account deleted");
        Ok(())
    }

    /// Create the configured bootstrap administrator unless the username is
    /// already taken. Returns `None` when nothing was created.
    pub fn seed_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<StaffAccount>, StaffServiceError> {
        if self.repository.find_staff_by_username(username.trim())?.is_some() {
            return Ok(None);
        }
        let input = StaffInput {
            username: username.to_string(),
            password: Some(password.to_string()),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            role: Role::Admin,
            team: String::new(),
            is_active: true,
        };
        let account = self.provision(input, true)?;
        info!(staff = %account.id, username = %account.username, "bootstrap admin seeded");
        Ok(Some(account))
    }

    /// Look up an account by username and check the password. Accounts
    /// without a password never match.
    pub fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<StaffAccount>, StaffServiceError> {
        let Some(account) = self.repository.find_staff_by_username(username.trim())? else {
            return Ok(None);
        };
        let verified = account
            .password_hash
            .as_ref()
            .is_some_and(|hash| self.hasher.verify(password, hash));
        if verified {
            Ok(Some(account))
        } else {
            warn!(username = %account.username, "password mismatch");
            Ok(None)
        }
    }

    pub fn record_login(
        &self,
        id: StaffId,
        at: DateTime<Utc>,
    ) -> Result<StaffAccount, StaffServiceError> {
        self.repository.update_staff(id, |account| {
            account.last_login = Some(at);
            Ok::<(), StaffServiceError>(())
        })
    }

    /// Validate and insert an account without a capability check. Used by
    /// admin creation, public registration, and bootstrap seeding.
    pub(crate) fn provision(
        &self,
        input: StaffInput,
        is_staff: bool,
    ) -> Result<StaffAccount, StaffServiceError> {
        let mut errors = FieldErrors::new();
        check_username(&input.username, &mut errors);
        if let Some(password) = input.password.as_deref() {
            check_password(password, &mut errors);
        }
        check_email(&input.email, &mut errors);
        let username = input.username.trim().to_string();
        if !errors.contains("username")
            && self.repository.find_staff_by_username(&username)?.is_some()
        {
            errors.add("username", USERNAME_TAKEN);
        }
        errors.into_result()?;

        let password_hash: Option<PasswordHash> = input
            .password
            .as_deref()
            .map(|raw| self.hasher.hash(raw))
            .transpose()?;
        let account = self.repository.insert_staff(NewStaff {
            username,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email.trim().to_string(),
            phone: input.phone,
            role: input.role,
            team: input.team,
            is_active: input.is_active,
            is_staff,
        })?;
        Ok(account)
    }
}

fn apply_patch(
    account: &mut StaffAccount,
    patch: StaffPatch,
    password_hash: Option<PasswordHash>,
) {
    if let Some(username) = patch.username {
        account.username = username.trim().to_string();
    }
    if let Some(first_name) = patch.first_name {
        account.first_name = first_name;
    }
    if let Some(last_name) = patch.last_name {
        account.last_name = last_name;
    }
    if let Some(email) = patch.email {
        account.email = email.trim().to_string();
    }
    if let Some(phone) = patch.phone {
        account.phone = phone;
    }
    if let Some(role) = patch.role {
        account.role = role;
    }
    if let Some(team) = patch.team {
        account.team = team;
    }
    if let Some(is_active) = patch.is_active {
        account.is_active = is_active;
    }
    if password_hash.is_some() {
        account.password_hash = password_hash;
    }
}

pub(crate) fn check_username(username: &str, errors: &mut FieldErrors) {
    let username = username.trim();
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.add(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_LEN} characters."),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub(crate) fn check_password(password: &str, errors: &mut FieldErrors) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    let email = email.trim();
    if !email.is_empty() && !is_plausible_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Error raised by the staff directory.
#[derive(Debug, thiserror::Error)]
pub enum StaffServiceError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("staff account not found")]
    NotFound,
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Hashing(#[from] PasswordHashError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for StaffServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { field: "username" } => {
                FieldErrors::single("username", USERNAME_TAKEN).into()
            }
            RepositoryError::Conflict { field } => {
                FieldErrors::single(field, format!("This {field} is already in use.")).into()
            }
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
