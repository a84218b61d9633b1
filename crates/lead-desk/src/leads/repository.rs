use serde::Deserialize;

use super::domain::{
    Lead, LeadId, LeadPriority, LeadSource, LeadStatus, NewLead, ProcessingStatus,
};
use crate::audit::{AuditRecord, AuditSink};
use crate::staff::StaffId;
use crate::store::{Page, PageRequest, RepositoryError};

/// Lead storage. `insert_lead` and `update_lead` are units of work: the lead
/// write, the uniqueness and assignee checks, and any history staged through
/// the sink commit together or not at all.
pub trait LeadRepository: Send + Sync {
    /// `audit` runs against the lead as it will be stored, id and timestamps
    /// already assigned.
    fn insert_lead<E, F>(&self, lead: NewLead, audit: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>;

    /// Read-modify-write of one lead. `apply` sees the stored value with
    /// `updated_at` already set to the commit time and may mutate it;
    /// returning an error discards the whole change.
    fn update_lead<E, F>(&self, id: LeadId, apply: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>;

    fn fetch_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError>;

    /// Removes the lead only; its history rows stay queryable.
    fn delete_lead(&self, id: LeadId) -> Result<(), RepositoryError>;

    fn list_leads(&self, query: &LeadQuery) -> Result<Page<Lead>, RepositoryError>;

    fn phone_in_use(&self, phone: &str, except: Option<LeadId>) -> Result<bool, RepositoryError>;

    fn email_in_use(&self, email: &str, except: Option<LeadId>) -> Result<bool, RepositoryError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LeadOrdering {
    #[serde(rename = "created_at")]
    CreatedAt,
    #[default]
    #[serde(rename = "-created_at")]
    CreatedAtDesc,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "-priority")]
    PriorityDesc,
}

/// Filters, search, and ordering for the administrative lead list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadQuery {
    pub priority: Option<LeadPriority>,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub processing_status: Option<ProcessingStatus>,
    pub assigned_to: Option<StaffId>,
    /// Matched against name, phone, email, and program.
    pub search: Option<String>,
    pub ordering: LeadOrdering,
    pub page: PageRequest,
}

impl LeadQuery {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.priority.map_or(true, |value| lead.priority == value)
            && self.status.map_or(true, |value| lead.status == value)
            && self.source.map_or(true, |value| lead.source == value)
            && self
                .processing_status
                .map_or(true, |value| lead.processing_status == value)
            && self
                .assigned_to
                .map_or(true, |value| lead.assigned_to == Some(value))
            && self.search.as_deref().map_or(true, |term| {
                crate::store::matches_search(
                    term,
                    &[
                        lead.name.as_str(),
                        lead.phone.as_str(),
                        lead.email.as_deref().unwrap_or_default(),
                        lead.program.as_str(),
                    ],
                )
            })
    }

    /// Orders in place; `id` keeps the order stable between equal keys.
    pub fn sort(&self, leads: &mut [Lead]) {
        match self.ordering {
            LeadOrdering::CreatedAt => leads.sort_by_key(|lead| (lead.created_at, lead.id)),
            LeadOrdering::CreatedAtDesc => {
                leads.sort_by_key(|lead| std::cmp::Reverse((lead.created_at, lead.id)))
            }
            LeadOrdering::Priority => {
                leads.sort_by_key(|lead| (lead.priority.rank(), std::cmp::Reverse(lead.id)))
            }
            LeadOrdering::PriorityDesc => leads.sort_by_key(|lead| {
                (std::cmp::Reverse(lead.priority.rank()), std::cmp::Reverse(lead.id))
            }),
        }
    }
}
