use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::staff::StaffId;

/// Store-assigned lead identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub u64);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel the lead arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Website,
    WalkIn,
    Referral,
    SocialMedia,
    PhoneCall,
    Email,
    Event,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl LeadPriority {
    /// Sort key for `ordering=priority`, lowest urgency first.
    pub fn rank(self) -> u8 {
        match self {
            LeadPriority::Low => 0,
            LeadPriority::Medium => 1,
            LeadPriority::High => 2,
        }
    }
}

/// Qualification state of a lead in the inquiry-to-registration pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    FollowUp,
    Interested,
    NotInterested,
    Submitted,
    Registered,
    Completed,
    Lost,
}

impl LeadStatus {
    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Contacted => "CONTACTED",
            LeadStatus::FollowUp => "FOLLOW_UP",
            LeadStatus::Interested => "INTERESTED",
            LeadStatus::NotInterested => "NOT_INTERESTED",
            LeadStatus::Submitted => "SUBMITTED",
            LeadStatus::Registered => "REGISTERED",
            LeadStatus::Completed => "COMPLETED",
            LeadStatus::Lost => "LOST",
        }
    }

    /// `REGISTERED` and `COMPLETED` are only reachable through later updates.
    pub fn allowed_at_creation(self) -> bool {
        !matches!(self, LeadStatus::Registered | LeadStatus::Completed)
    }
}

/// Position in the operational follow-up pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl ProcessingStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::InProgress => "IN_PROGRESS",
            ProcessingStatus::OnHold => "ON_HOLD",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored lead record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: LeadSource,
    pub custom_source: Option<String>,
    pub priority: LeadPriority,
    pub program: String,
    pub location: String,
    pub remarks: Option<String>,
    pub status: LeadStatus,
    pub processing_status: ProcessingStatus,
    pub assigned_to: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processing_status_date: Option<DateTime<Utc>>,
    pub registration_date: Option<DateTime<Utc>>,
}

/// Validated lead contents handed to the store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: LeadSource,
    pub custom_source: Option<String>,
    pub priority: LeadPriority,
    pub program: String,
    pub location: String,
    pub remarks: Option<String>,
    pub status: LeadStatus,
    pub processing_status: ProcessingStatus,
    pub assigned_to: Option<StaffId>,
}

/// Inbound payload for lead creation and full replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSubmission {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub source: LeadSource,
    #[serde(default)]
    pub custom_source: Option<String>,
    #[serde(default)]
    pub priority: LeadPriority,
    pub program: String,
    pub location: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub processing_status: Option<ProcessingStatus>,
    #[serde(default)]
    pub assigned_to: Option<StaffId>,
}

/// Partial update. Nullable fields distinguish "absent" (`None`) from an
/// explicit `null` (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default)]
    pub source: Option<LeadSource>,
    #[serde(default, deserialize_with = "nullable")]
    pub custom_source: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<LeadPriority>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub remarks: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub processing_status: Option<ProcessingStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to: Option<Option<StaffId>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self == &LeadPatch::default()
    }
}

/// A full replacement rewrites every required field; optional fields left out
/// of the payload keep their stored value.
impl From<LeadSubmission> for LeadPatch {
    fn from(submission: LeadSubmission) -> Self {
        Self {
            name: Some(submission.name),
            phone: Some(submission.phone),
            email: submission.email.map(Some),
            source: Some(submission.source),
            custom_source: submission.custom_source.map(Some),
            priority: Some(submission.priority),
            program: Some(submission.program),
            location: Some(submission.location),
            remarks: submission.remarks.map(Some),
            status: submission.status,
            processing_status: submission.processing_status,
            assigned_to: submission.assigned_to.map(Some),
        }
    }
}

/// Row shape for the administrative lead list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadListRow {
    pub id: LeadId,
    pub name: String,
    pub phone: String,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub processing_status: ProcessingStatus,
    pub priority: LeadPriority,
    pub program: String,
    pub assigned_to_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeadListRow {
    pub fn from_lead(lead: Lead, assigned_to_name: Option<String>) -> Self {
        Self {
            id: lead.id,
            name: lead.name,
            phone: lead.phone,
            source: lead.source,
            status: lead.status,
            processing_status: lead.processing_status,
            priority: lead.priority,
            program: lead.program,
            assigned_to_name,
            created_at: lead.created_at,
        }
    }
}

/// Payload for the direct processing-update endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingUpdateSubmission {
    pub status: ProcessingStatus,
    #[serde(default)]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_statuses_are_rejected_at_creation() {
        assert!(!LeadStatus::Registered.allowed_at_creation());
        assert!(!LeadStatus::Completed.allowed_at_creation());
        assert!(LeadStatus::Submitted.allowed_at_creation());
        assert!(LeadStatus::New.allowed_at_creation());
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: LeadPatch =
            serde_json::from_value(json!({ "remarks": null, "name": "Asha" })).expect("parses");
        assert_eq!(patch.remarks, Some(None));
        assert_eq!(patch.email, None);
        assert_eq!(patch.name.as_deref(), Some("Asha"));
        assert!(!patch.is_empty());
        assert!(LeadPatch::default().is_empty());
    }

    #[test]
    fn unknown_enum_values_fail_to_parse() {
        let result = serde_json::from_value::<LeadPatch>(json!({
            "processing_status": "SOMEWHERE"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn replacement_keeps_absent_optionals_untouched() {
        let submission: LeadSubmission = serde_json::from_value(json!({
            "name": "Asha Menon",
            "phone": "9876543210",
            "source": "WEBSITE",
            "program": "Nursing",
            "location": "Kochi"
        }))
        .expect("parses");
        let patch = LeadPatch::from(submission);
        assert_eq!(patch.priority, Some(LeadPriority::Medium));
        assert_eq!(patch.remarks, None);
        assert_eq!(patch.status, None);
    }
}
