use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{Page, RepositoryError};
use crate::audit::{
    newest_first, AuditEntry, AuditRecord, AuditRepository, AuditSink, ProcessingUpdate,
    RemarkHistory, StagedAudit,
};
use crate::auth::{TokenDigest, TokenGrant, TokenRepository};
use crate::leads::{Lead, LeadId, LeadQuery, LeadRepository, NewLead};
use crate::staff::{NewStaff, StaffAccount, StaffId, StaffQuery, StaffRepository};

/// Process-local store backing every repository trait with one lock, so a
/// lead write and its history rows land atomically. Closures handed to the
/// unit-of-work methods run under that lock and must not call back into the
/// store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    leads: BTreeMap<LeadId, Lead>,
    processing_updates: Vec<ProcessingUpdate>,
    remark_history: Vec<RemarkHistory>,
    staff: BTreeMap<StaffId, StaffAccount>,
    tokens: HashMap<TokenDigest, TokenGrant>,
    last_lead_id: u64,
    last_staff_id: u64,
    last_processing_id: u64,
    last_remark_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl Tables {
    fn ensure_contact_unique(&self, lead: &Lead) -> Result<(), RepositoryError> {
        let others = self.leads.values().filter(|other| other.id != lead.id);
        for other in others {
            if other.phone == lead.phone {
                return Err(RepositoryError::Conflict { field: "phone" });
            }
            if lead.email.is_some() && other.email == lead.email {
                return Err(RepositoryError::Conflict { field: "email" });
            }
        }
        Ok(())
    }

    fn ensure_assignee_exists(&self, lead: &Lead) -> Result<(), RepositoryError> {
        match lead.assigned_to {
            Some(staff_id) if !self.staff.contains_key(&staff_id) => {
                Err(RepositoryError::MissingReference {
                    field: "assigned_to",
                    id: staff_id.0,
                })
            }
            _ => Ok(()),
        }
    }

    fn ensure_username_unique(&self, account: &StaffAccount) -> Result<(), RepositoryError> {
        let clash = self
            .staff
            .values()
            .any(|other| other.id != account.id && other.username == account.username);
        if clash {
            Err(RepositoryError::Conflict { field: "username" })
        } else {
            Ok(())
        }
    }

    fn commit_audit(&mut self, entries: Vec<AuditEntry>, at: DateTime<Utc>) -> Vec<AuditRecord> {
        entries
            .into_iter()
            .map(|entry| match entry {
                AuditEntry::ProcessingChange {
                    lead,
                    status,
                    changed_by,
                    notes,
                } => {
                    self.last_processing_id += 1;
                    let update = ProcessingUpdate {
                        id: self.last_processing_id,
                        lead,
                        status,
                        changed_by,
                        notes,
                        timestamp: at,
                    };
                    self.processing_updates.push(update.clone());
                    AuditRecord::Processing(update)
                }
                AuditEntry::RemarkChange {
                    lead,
                    previous_remarks,
                    new_remarks,
                    changed_by,
                } => {
                    self.last_remark_id += 1;
                    let history = RemarkHistory {
                        id: self.last_remark_id,
                        lead,
                        previous_remarks,
                        new_remarks,
                        changed_by,
                        changed_at: at,
                    };
                    self.remark_history.push(history.clone());
                    AuditRecord::Remark(history)
                }
            })
            .collect()
    }
}

impl LeadRepository for MemoryStore {
    fn insert_lead<E, F>(&self, lead: NewLead, audit: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let mut stored = Lead {
            id: LeadId(tables.last_lead_id + 1),
            name: lead.name,
            phone: lead.phone,
            email: lead.email,
            source: lead.source,
            custom_source: lead.custom_source,
            priority: lead.priority,
            program: lead.program,
            location: lead.location,
            remarks: lead.remarks,
            status: lead.status,
            processing_status: lead.processing_status,
            assigned_to: lead.assigned_to,
            created_at: now,
            updated_at: now,
            processing_status_date: None,
            registration_date: None,
        };
        tables.ensure_contact_unique(&stored)?;
        tables.ensure_assignee_exists(&stored)?;

        let mut staged = StagedAudit::default();
        audit(&mut stored, &mut staged)?;
        tables.ensure_contact_unique(&stored)?;
        tables.ensure_assignee_exists(&stored)?;

        tables.last_lead_id = stored.id.0;
        let records = tables.commit_audit(staged.into_entries(), now);
        tables.leads.insert(stored.id, stored.clone());
        Ok((stored, records))
    }

    fn update_lead<E, F>(&self, id: LeadId, apply: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut tables = self.lock()?;
        let mut lead = tables
            .leads
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;

        let now = Utc::now();
        lead.updated_at = now;

        let mut staged = StagedAudit::default();
        apply(&mut lead, &mut staged)?;
        lead.id = id;
        lead.updated_at = now;
        tables.ensure_contact_unique(&lead)?;
        tables.ensure_assignee_exists(&lead)?;

        let records = tables.commit_audit(staged.into_entries(), now);
        tables.leads.insert(id, lead.clone());
        Ok((lead, records))
    }

    fn fetch_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.lock()?.leads.get(&id).cloned())
    }

    fn delete_lead(&self, id: LeadId) -> Result<(), RepositoryError> {
        self.lock()?
            .leads
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_leads(&self, query: &LeadQuery) -> Result<Page<Lead>, RepositoryError> {
        let mut matching: Vec<Lead> = self
            .lock()?
            .leads
            .values()
            .filter(|lead| query.matches(lead))
            .cloned()
            .collect();
        query.sort(&mut matching);
        Ok(query.page.paginate(matching))
    }

    fn phone_in_use(&self, phone: &str, except: Option<LeadId>) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .leads
            .values()
            .any(|lead| Some(lead.id) != except && lead.phone == phone))
    }

    fn email_in_use(&self, email: &str, except: Option<LeadId>) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .leads
            .values()
            .any(|lead| Some(lead.id) != except && lead.email.as_deref() == Some(email)))
    }
}

impl AuditRepository for MemoryStore {
    fn processing_updates(&self, lead: LeadId) -> Result<Vec<ProcessingUpdate>, RepositoryError> {
        let mut rows: Vec<ProcessingUpdate> = self
            .lock()?
            .processing_updates
            .iter()
            .filter(|update| update.lead == lead)
            .cloned()
            .collect();
        newest_first(&mut rows, |update| (update.timestamp, update.id));
        Ok(rows)
    }

    fn remark_history(&self, lead: LeadId) -> Result<Vec<RemarkHistory>, RepositoryError> {
        let mut rows: Vec<RemarkHistory> = self
            .lock()?
            .remark_history
            .iter()
            .filter(|history| history.lead == lead)
            .cloned()
            .collect();
        newest_first(&mut rows, |history| (history.changed_at, history.id));
        Ok(rows)
    }
}

impl StaffRepository for MemoryStore {
    fn insert_staff(&self, staff: NewStaff) -> Result<StaffAccount, RepositoryError> {
        let mut tables = self.lock()?;
        let account = StaffAccount {
            id: StaffId(tables.last_staff_id + 1),
            username: staff.username,
            password_hash: staff.password_hash,
            first_name: staff.first_name,
            last_name: staff.last_name,
            email: staff.email,
            phone: staff.phone,
            role: staff.role,
            team: staff.team,
            is_active: staff.is_active,
            is_staff: staff.is_staff,
            date_joined: Utc::now(),
            last_login: None,
        };
        tables.ensure_username_unique(&account)?;
        tables.last_staff_id = account.id.0;
        tables.staff.insert(account.id, account.clone());
        Ok(account)
    }

    fn update_staff<E, F>(&self, id: StaffId, apply: F) -> Result<StaffAccount, E>
    where
        F: FnOnce(&mut StaffAccount) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut tables = self.lock()?;
        let mut account = tables
            .staff
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        apply(&mut account)?;
        account.id = id;
        tables.ensure_username_unique(&account)?;
        tables.staff.insert(id, account.clone());
        Ok(account)
    }

    fn fetch_staff(&self, id: StaffId) -> Result<Option<StaffAccount>, RepositoryError> {
        Ok(self.lock()?.staff.get(&id).cloned())
    }

    fn find_staff_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StaffAccount>, RepositoryError> {
        Ok(self
            .lock()?
            .staff
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    /// Leads assigned to the account become unassigned and its tokens are
    /// dropped. History rows keep the old `changed_by` id.
    fn delete_staff(&self, id: StaffId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .staff
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        for lead in tables.leads.values_mut() {
            if lead.assigned_to == Some(id) {
                lead.assigned_to = None;
            }
        }
        tables.tokens.retain(|_, grant| grant.owner != id);
        Ok(())
    }

    fn list_staff(&self, query: &StaffQuery) -> Result<Page<StaffAccount>, RepositoryError> {
        let mut matching: Vec<StaffAccount> = self
            .lock()?
            .staff
            .values()
            .filter(|account| query.matches(account))
            .cloned()
            .collect();
        query.sort(&mut matching);
        Ok(query.page.paginate(matching))
    }
}

impl TokenRepository for MemoryStore {
    fn store_token(&self, digest: TokenDigest, grant: TokenGrant) -> Result<(), RepositoryError> {
        self.lock()?.tokens.insert(digest, grant);
        Ok(())
    }

    fn find_token(&self, digest: &TokenDigest) -> Result<Option<TokenGrant>, RepositoryError> {
        Ok(self.lock()?.tokens.get(digest).cloned())
    }

    fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut tables = self.lock()?;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, grant| grant.expires_at > now);
        Ok(before - tables.tokens.len())
    }
}
