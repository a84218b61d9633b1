use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::password::PasswordHash;
use crate::access::{Actor, Role};
use crate::store::PageRequest;

/// Store-assigned staff account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub u64);

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored operator account. Never serialized directly; see the view types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffAccount {
    pub id: StaffId,
    pub username: String,
    /// `None` for accounts created without a password; they cannot log in.
    pub password_hash: Option<PasswordHash>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub team: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl StaffAccount {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            is_staff: self.is_staff,
        }
    }
}

/// Validated account contents handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStaff {
    pub username: String,
    pub password_hash: Option<PasswordHash>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub team: String,
    pub is_active: bool,
    pub is_staff: bool,
}

/// Inbound payload for admin staff creation and full replacement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaffInput {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub team: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial staff update; an absent password keeps the stored hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StaffPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<StaffInput> for StaffPatch {
    fn from(input: StaffInput) -> Self {
        Self {
            username: Some(input.username),
            password: input.password,
            first_name: Some(input.first_name),
            last_name: Some(input.last_name),
            email: Some(input.email),
            phone: Some(input.phone),
            role: Some(input.role),
            team: Some(input.team),
            is_active: Some(input.is_active),
        }
    }
}

/// Row shape for the staff list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffSummary {
    pub id: StaffId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub date_joined: DateTime<Utc>,
}

impl From<&StaffAccount> for StaffSummary {
    fn from(account: &StaffAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            role: account.role,
            date_joined: account.date_joined,
        }
    }
}

/// Full account view without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffDetail {
    pub id: StaffId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub team: String,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<&StaffAccount> for StaffDetail {
    fn from(account: &StaffAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            team: account.team.clone(),
            date_joined: account.date_joined,
            last_login: account.last_login,
            is_active: account.is_active,
        }
    }
}

/// Identity fragment returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffIdentity {
    pub id: StaffId,
    pub username: String,
    pub role: Role,
}

impl From<&StaffAccount> for StaffIdentity {
    fn from(account: &StaffAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            role: account.role,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum StaffOrdering {
    #[serde(rename = "date_joined")]
    DateJoined,
    #[default]
    #[serde(rename = "-date_joined")]
    DateJoinedDesc,
    #[serde(rename = "username")]
    Username,
    #[serde(rename = "-username")]
    UsernameDesc,
}

/// Search and ordering for the staff list. Inactive accounts never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffQuery {
    /// Matched against username, first and last name, email, and role.
    pub search: Option<String>,
    pub ordering: StaffOrdering,
    pub page: PageRequest,
}

impl StaffQuery {
    pub fn matches(&self, account: &StaffAccount) -> bool {
        account.is_active
            && self.search.as_deref().map_or(true, |term| {
                crate::store::matches_search(
                    term,
                    &[
                        account.username.as_str(),
                        account.first_name.as_str(),
                        account.last_name.as_str(),
                        account.email.as_str(),
                        account.role.label(),
                    ],
                )
            })
    }

    pub fn sort(&self, accounts: &mut [StaffAccount]) {
        match self.ordering {
            StaffOrdering::DateJoined => {
                accounts.sort_by_key(|account| (account.date_joined, account.id))
            }
            StaffOrdering::DateJoinedDesc => accounts
                .sort_by_key(|account| std::cmp::Reverse((account.date_joined, account.id))),
            StaffOrdering::Username => {
                accounts.sort_by(|left, right| left.username.cmp(&right.username))
            }
            StaffOrdering::UsernameDesc => {
                accounts.sort_by(|left, right| right.username.cmp(&left.username))
            }
        }
    }
}
