//! Append-only history of lead changes.
//!
//! Entries are staged through an [`AuditSink`] that belongs to the unit of work
//! mutating the lead, so a lead change and its history rows commit or fail
//! together. Nothing in this module can edit or remove a committed row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Actor;
use crate::leads::{LeadId, ProcessingStatus};
use crate::staff::StaffId;
use crate::store::RepositoryError;

/// Note attached to the entry written when a lead starts outside `PENDING`.
pub const INITIAL_STATUS_NOTE: &str = "Initial status on lead creation";
/// Note attached to entries written by the update diff.
pub const STATUS_UPDATED_NOTE: &str = "Status updated via API";

/// Committed processing-status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingUpdate {
    pub id: u64,
    pub lead: LeadId,
    pub status: ProcessingStatus,
    pub changed_by: StaffId,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

/// Committed remarks change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemarkHistory {
    pub id: u64,
    pub lead: LeadId,
    pub previous_remarks: Option<String>,
    pub new_remarks: Option<String>,
    pub changed_by: StaffId,
    pub changed_at: DateTime<Utc>,
}

/// History row awaiting commit. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEntry {
    ProcessingChange {
        lead: LeadId,
        status: ProcessingStatus,
        changed_by: StaffId,
        notes: String,
    },
    RemarkChange {
        lead: LeadId,
        previous_remarks: Option<String>,
        new_remarks: Option<String>,
        changed_by: StaffId,
    },
}

impl AuditEntry {
    pub fn lead(&self) -> LeadId {
        match self {
            AuditEntry::ProcessingChange { lead, .. } | AuditEntry::RemarkChange { lead, .. } => {
                *lead
            }
        }
    }
}

/// Committed history row of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRecord {
    Processing(ProcessingUpdate),
    Remark(RemarkHistory),
}

impl AuditRecord {
    pub fn as_processing(&self) -> Option<&ProcessingUpdate> {
        match self {
            AuditRecord::Processing(update) => Some(update),
            AuditRecord::Remark(_) => None,
        }
    }

    pub fn as_remark(&self) -> Option<&RemarkHistory> {
        match self {
            AuditRecord::Remark(history) => Some(history),
            AuditRecord::Processing(_) => None,
        }
    }
}

/// Receives history rows inside an open unit of work.
pub trait AuditSink {
    fn append(&mut self, entry: AuditEntry) -> Result<(), RepositoryError>;
}

/// Staging buffer used by stores that commit history after the lead write.
#[derive(Debug, Default)]
pub struct StagedAudit {
    entries: Vec<AuditEntry>,
}

impl StagedAudit {
    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

impl AuditSink for StagedAudit {
    fn append(&mut self, entry: AuditEntry) -> Result<(), RepositoryError> {
        self.entries.push(entry);
        Ok(())
    }
}

/// Read side of the audit trail.
pub trait AuditRepository: Send + Sync {
    /// Processing updates for `lead`, newest first.
    fn processing_updates(&self, lead: LeadId) -> Result<Vec<ProcessingUpdate>, RepositoryError>;
    /// Remark history for `lead`, newest first.
    fn remark_history(&self, lead: LeadId) -> Result<Vec<RemarkHistory>, RepositoryError>;
}

/// Writes history rows on behalf of an actor. It never checks whether the
/// value actually changed; callers diff before recording.
pub struct AuditRecorder<'a> {
    sink: &'a mut dyn AuditSink,
}

impl<'a> AuditRecorder<'a> {
    pub fn new(sink: &'a mut dyn AuditSink) -> Self {
        Self { sink }
    }

    pub fn record_processing_change(
        &mut self,
        lead: LeadId,
        status: ProcessingStatus,
        actor: &Actor,
        notes: &str,
    ) -> Result<(), RepositoryError> {
        tracing::debug!(%lead, %status, actor = %actor.username, "recording processing change");
        self.sink.append(AuditEntry::ProcessingChange {
            lead,
            status,
            changed_by: actor.id,
            notes: notes.to_string(),
        })
    }

    pub fn record_remark_change(
        &mut self,
        lead: LeadId,
        previous_remarks: Option<String>,
        new_remarks: Option<String>,
        actor: &Actor,
    ) -> Result<(), RepositoryError> {
        tracing::debug!(%lead, actor = %actor.username, "recording remark change");
        self.sink.append(AuditEntry::RemarkChange {
            lead,
            previous_remarks,
            new_remarks,
            changed_by: actor.id,
        })
    }
}

/// Newest first; ties on the timestamp fall back to insertion order.
pub(crate) fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, u64)) {
    rows.sort_by(|left, right| key(right).cmp(&key(left)));
}
