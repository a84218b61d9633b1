//! Field rules shared by lead creation and update.
//!
//! Each check appends to a [`FieldErrors`] instead of returning early so a
//! single response can report every problem with a payload.

use super::domain::{LeadSource, LeadStatus};
use crate::validation::{is_plausible_email, FieldErrors};

pub const MIN_NAME_LEN: usize = 3;
pub const MIN_PHONE_DIGITS: usize = 10;

pub(crate) const PHONE_TAKEN: &str = "A lead with this phone number already exists.";
pub(crate) const EMAIL_TAKEN: &str = "A lead with this email already exists.";

pub fn check_name(name: &str, errors: &mut FieldErrors) {
    if name.trim().chars().count() < MIN_NAME_LEN {
        errors.add(
            "name",
            format!("Name must be at least {MIN_NAME_LEN} characters long."),
        );
    }
}

pub fn check_phone(phone: &str, errors: &mut FieldErrors) {
    let phone = phone.trim();
    if !phone.chars().all(|c| c.is_ascii_digit()) {
        errors.add("phone", "Phone number must contain only digits.");
    } else if phone.len() < MIN_PHONE_DIGITS {
        errors.add(
            "phone",
            format!("Phone number must be at least {MIN_PHONE_DIGITS} digits."),
        );
    }
}

pub fn check_email(email: Option<&str>, errors: &mut FieldErrors) {
    if let Some(email) = email {
        if !is_plausible_email(email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }
    }
}

pub fn check_custom_source(
    source: LeadSource,
    custom_source: Option<&str>,
    errors: &mut FieldErrors,
) {
    let missing = custom_source.map_or(true, |value| value.trim().is_empty());
    if source == LeadSource::Other && missing {
        errors.add(
            "custom_source",
            "Custom source is required when source is OTHER.",
        );
    }
}

pub fn check_initial_status(status: Option<LeadStatus>, errors: &mut FieldErrors) {
    if let Some(status) = status {
        if !status.allowed_at_creation() {
            errors.add(
                "status",
                format!("Status cannot be {} at creation.", status.label()),
            );
        }
    }
}

/// Blank optional text is stored as absent.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
