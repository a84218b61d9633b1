use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::domain::{
    Lead, LeadId, LeadListRow, LeadPatch, LeadStatus, LeadSubmission, NewLead, ProcessingStatus,
    ProcessingUpdateSubmission,
};
use super::repository::{LeadQuery, LeadRepository};
use super::validation::{
    check_custom_source, check_email, check_initial_status, check_name, check_phone,
    normalize_optional, EMAIL_TAKEN, PHONE_TAKEN,
};
use crate::access::{authorize, AccessDenied, Actor, Operation, Role};
use crate::audit::{
    AuditRecorder, AuditRepository, ProcessingUpdate, RemarkHistory, INITIAL_STATUS_NOTE,
    STATUS_UPDATED_NOTE,
};
use crate::staff::{StaffId, StaffRepository};
use crate::store::{Page, RepositoryError};
use crate::validation::FieldErrors;

/// Lead lifecycle engine: validation, state rules, and audit-on-change.
pub struct LeadLifecycle<R> {
    repository: Arc<R>,
}

impl<R> LeadLifecycle<R>
where
    R: LeadRepository + AuditRepository + StaffRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validate and persist a new lead. A non-`PENDING` starting processing
    /// status is recorded in the timeline within the same unit of work.
    pub fn create(
        &self,
        submission: LeadSubmission,
        actor: &Actor,
    ) -> Result<Lead, LeadServiceError> {
        authorize(actor, Operation::CreateLead)?;

        let email = normalize_optional(submission.email);
        let custom_source = normalize_optional(submission.custom_source);
        let phone = submission.phone.trim().to_string();

        let mut errors = FieldErrors::new();
        check_name(&submission.name, &mut errors);
        check_phone(&phone, &mut errors);
        check_email(email.as_deref(), &mut errors);
        check_custom_source(submission.source, custom_source.as_deref(), &mut errors);
        check_initial_status(submission.status, &mut errors);
        self.check_contact_uniqueness(
            (!errors.contains("phone")).then_some(phone.as_str()),
            email.as_deref().filter(|_| !errors.contains("email")),
            None,
            &mut errors,
        )?;
        self.check_assignee(submission.assigned_to, &mut errors)?;
        errors.into_result()?;

        let new_lead = NewLead {
            name: submission.name.trim().to_string(),
            phone,
            email,
            source: submission.source,
            custom_source,
            priority: submission.priority,
            program: submission.program,
            location: submission.location,
            remarks: submission.remarks,
            status: submission.status.unwrap_or_default(),
            processing_status: submission.processing_status.unwrap_or_default(),
            assigned_to: submission.assigned_to,
        };

        let (lead, audit) = self.repository.insert_lead(new_lead, |lead, sink| {
            if lead.processing_status != ProcessingStatus::Pending {
                lead.processing_status_date = Some(lead.created_at);
                AuditRecorder::new(sink).record_processing_change(
                    lead.id,
                    lead.processing_status,
                    actor,
                    INITIAL_STATUS_NOTE,
                )?;
            }
            Ok::<(), LeadServiceError>(())
        })?;

        info!(
            lead = %lead.id,
            actor = %actor.username,
            history_entries = audit.len(),
            "lead created"
        );
        Ok(lead)
    }

    pub fn get(&self, id: LeadId, actor: &Actor) -> Result<Lead, LeadServiceError> {
        authorize(actor, Operation::ViewLeads)?;
        self.repository
            .fetch_lead(id)?
            .ok_or(LeadServiceError::NotFound)
    }

    pub fn list(
        &self,
        query: &LeadQuery,
        actor: &Actor,
    ) -> Result<Page<LeadListRow>, LeadServiceError> {
        authorize(actor, Operation::ViewLeads)?;
        let page = self.repository.list_leads(query)?;

        let mut usernames: BTreeMap<StaffId, Option<String>> = BTreeMap::new();
        for staff_id in page.results.iter().filter_map(|lead| lead.assigned_to) {
            if !usernames.contains_key(&staff_id) {
                let username = self
                    .repository
                    .fetch_staff(staff_id)?
                    .map(|account| account.username);
                usernames.insert(staff_id, username);
            }
        }

        Ok(page.map(|lead| {
            let assigned_to_name = lead
                .assigned_to
                .and_then(|staff_id| usernames.get(&staff_id).cloned().flatten());
            LeadListRow::from_lead(lead, assigned_to_name)
        }))
    }

    /// Apply a partial update, then diff the stored value before and after to
    /// decide which history rows to append. Resubmitting an unchanged value
    /// writes nothing.
    pub fn update(
        &self,
        id: LeadId,
        patch: LeadPatch,
        actor: &Actor,
    ) -> Result<Lead, LeadServiceError> {
        authorize(actor, Operation::ModifyLeads)?;
        let patch = self.validate_patch(id, patch)?;

        let (lead, audit) = self.repository.update_lead(id, |lead, sink| {
            let now = lead.updated_at;
            let previous_remarks = lead.remarks.clone();
            let previous_processing = lead.processing_status;
            let previous_status = lead.status;

            apply_patch(lead, patch);
            let mut errors = FieldErrors::new();
            check_custom_source(lead.source, lead.custom_source.as_deref(), &mut errors);
            errors.into_result()?;

            let mut recorder = AuditRecorder::new(sink);
            if lead.remarks != previous_remarks {
                recorder.record_remark_change(
                    lead.id,
                    previous_remarks,
                    lead.remarks.clone(),
                    actor,
                )?;
            }
            if lead.processing_status != previous_processing {
                lead.processing_status_date = Some(now);
                recorder.record_processing_change(
                    lead.id,
                    lead.processing_status,
                    actor,
                    STATUS_UPDATED_NOTE,
                )?;
            }
            if lead.status == LeadStatus::Registered
                && previous_status != LeadStatus::Registered
                && lead.registration_date.is_none()
            {
                lead.registration_date = Some(now);
            }
            Ok::<(), LeadServiceError>(())
        })?;

        info!(
            lead = %lead.id,
            actor = %actor.username,
            history_entries = audit.len(),
            "lead updated"
        );
        Ok(lead)
    }

    pub fn delete(&self, id: LeadId, actor: &Actor) -> Result<(), LeadServiceError> {
        authorize(actor, Operation::ModifyLeads)?;
        self.repository.delete_lead(id)?;
        info!(lead = %id, actor = %actor.username, "lead deleted");
        Ok(())
    }

    /// Processing history, newest first. History outlives the lead, so an
    /// unknown or deleted id yields whatever rows remain.
    pub fn timeline(
        &self,
        id: LeadId,
        actor: &Actor,
    ) -> Result<Vec<ProcessingUpdate>, LeadServiceError> {
        authorize(actor, Operation::ViewLeads)?;
        Ok(self.repository.processing_updates(id)?)
    }

    pub fn remark_history(
        &self,
        id: LeadId,
        actor: &Actor,
    ) -> Result<Vec<RemarkHistory>, LeadServiceError> {
        authorize(actor, Operation::ViewLeads)?;
        Ok(self.repository.remark_history(id)?)
    }

    /// Direct submission from the processing team. The submitter becomes
    /// `changed_by` and must hold the `PROCESSING` role; the lead's current
    /// processing status moves with the new entry.
    pub fn submit_processing_update(
        &self,
        id: LeadId,
        submission: ProcessingUpdateSubmission,
        actor: &Actor,
    ) -> Result<ProcessingUpdate, LeadServiceError> {
        authorize(actor, Operation::SubmitProcessingUpdate)?;
        if actor.role != Role::Processing {
            return Err(FieldErrors::single(
                "changed_by",
                "Only users with the PROCESSING role can submit processing updates.",
            )
            .into());
        }

        let (_, audit) = self.repository.update_lead(id, |lead, sink| {
            lead.processing_status = submission.status;
            lead.processing_status_date = Some(lead.updated_at);
            AuditRecorder::new(sink).record_processing_change(
                lead.id,
                submission.status,
                actor,
                &submission.notes,
            )?;
            Ok::<(), LeadServiceError>(())
        })?;

        let update = audit
            .iter()
            .find_map(|record| record.as_processing().cloned())
            .ok_or_else(|| {
                LeadServiceError::Repository(RepositoryError::Unavailable(
                    "processing update was not committed".to_string(),
                ))
            })?;
        info!(
            lead = %id,
            actor = %actor.username,
            status = %update.status,
            "processing update submitted"
        );
        Ok(update)
    }

    fn validate_patch(
        &self,
        id: LeadId,
        mut patch: LeadPatch,
    ) -> Result<LeadPatch, LeadServiceError> {
        let current = self
            .repository
            .fetch_lead(id)?
            .ok_or(LeadServiceError::NotFound)?;

        if let Some(phone) = patch.phone.as_mut() {
            *phone = phone.trim().to_string();
        }
        if let Some(email) = patch.email.take() {
            patch.email = Some(normalize_optional(email));
        }
        if let Some(custom_source) = patch.custom_source.take() {
            patch.custom_source = Some(normalize_optional(custom_source));
        }

        let mut errors = FieldErrors::new();
        if let Some(name) = patch.name.as_deref() {
            check_name(name, &mut errors);
        }
        if let Some(phone) = patch.phone.as_deref() {
            check_phone(phone, &mut errors);
        }
        if let Some(Some(email)) = patch.email.as_ref() {
            check_email(Some(email), &mut errors);
        }

        let source = patch.source.unwrap_or(current.source);
        let custom_source = match patch.custom_source.as_ref() {
            Some(value) => value.as_deref(),
            None => current.custom_source.as_deref(),
        };
        check_custom_source(source, custom_source, &mut errors);

        self.check_contact_uniqueness(
            patch
                .phone
                .as_deref()
                .filter(|phone| !errors.contains("phone") && *phone != current.phone),
            patch
                .email
                .as_ref()
                .and_then(|email| email.as_deref())
                .filter(|email| {
                    !errors.contains("email") && Some(*email) != current.email.as_deref()
                }),
            Some(id),
            &mut errors,
        )?;
        if let Some(assigned_to) = patch.assigned_to {
            self.check_assignee(assigned_to, &mut errors)?;
        }

        errors.into_result()?;
        Ok(patch)
    }

    fn check_contact_uniqueness(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
        except: Option<LeadId>,
        errors: &mut FieldErrors,
    ) -> Result<(), RepositoryError> {
        if let Some(phone) = phone {
            if self.repository.phone_in_use(phone, except)? {
                errors.add("phone", PHONE_TAKEN);
            }
        }
        if let Some(email) = email {
            if self.repository.email_in_use(email, except)? {
                errors.add("email", EMAIL_TAKEN);
            }
        }
        Ok(())
    }

    fn check_assignee(
        &self,
        assigned_to: Option<StaffId>,
        errors: &mut FieldErrors,
    ) -> Result<(), RepositoryError> {
        if let Some(staff_id) = assigned_to {
            if self.repository.fetch_staff(staff_id)?.is_none() {
                errors.add("assigned_to", missing_staff(staff_id));
            }
        }
        Ok(())
    }
}

fn missing_staff(staff_id: StaffId) -> String {
    format!("Invalid pk \"{staff_id}\" - object does not exist.")
}

fn apply_patch(lead: &mut Lead, patch: LeadPatch) {
    let LeadPatch {
        name,
        phone,
        email,
        source,
        custom_source,
        priority,
        program,
        location,
        remarks,
        status,
        processing_status,
        assigned_to,
    } = patch;

    if let Some(name) = name {
        lead.name = name.trim().to_string();
    }
    if let Some(phone) = phone {
        lead.phone = phone;
    }
    if let Some(email) = email {
        lead.email = email;
    }
    if let Some(source) = source {
        lead.source = source;
    }
    if let Some(custom_source) = custom_source {
        lead.custom_source = custom_source;
    }
    if let Some(priority) = priority {
        lead.priority = priority;
    }
    if let Some(program) = program {
        lead.program = program;
    }
    if let Some(location) = location {
        lead.location = location;
    }
    if let Some(remarks) = remarks {
        lead.remarks = remarks;
    }
    if let Some(status) = status {
        lead.status = status;
    }
    if let Some(processing_status) = processing_status {
        lead.processing_status = processing_status;
    }
    if let Some(assigned_to) = assigned_to {
        lead.assigned_to = assigned_to;
    }
}

/// Error raised by the lead lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("lead not found")]
    NotFound,
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for LeadServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { field: "phone" } => {
                FieldErrors::single("phone", PHONE_TAKEN).into()
            }
            RepositoryError::Conflict { field: "email" } => {
                FieldErrors::single("email", EMAIL_TAKEN).into()
            }
            RepositoryError::Conflict { field } => {
                FieldErrors::single(field, format!("This {field} is already in use.")).into()
            }
            RepositoryError::MissingReference {
                field: "assigned_to",
                id,
            } => FieldErrors::single("assigned_to", missing_staff(StaffId(id))).into(),
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
