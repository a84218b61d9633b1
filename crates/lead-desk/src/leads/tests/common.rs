use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::access::{Actor, Role};
use crate::api::{api_router, ApiState};
use crate::audit::{AuditRecord, AuditRepository, AuditSink, ProcessingUpdate, RemarkHistory};
use crate::auth::{Credentials, TokenIssuer};
use crate::leads::domain::{Lead, LeadId, LeadPriority, LeadSource, LeadSubmission, NewLead};
use crate::leads::repository::{LeadQuery, LeadRepository};
use crate::leads::service::LeadLifecycle;
use crate::staff::{NewStaff, PasswordHasher, StaffAccount, StaffId, StaffQuery, StaffRepository};
use crate::store::{MemoryStore, Page, RepositoryError};

pub(super) const PASSWORD: &str = "s3cret-pass";

pub(super) struct Harness {
    pub(super) store: Arc<MemoryStore>,
    pub(super) engine: LeadLifecycle<MemoryStore>,
    pub(super) admin: Actor,
    pub(super) exec: Actor,
    pub(super) processing: Actor,
    pub(super) media: Actor,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let admin = seed_staff(&*store, "admin", Role::Admin, true).actor();
    let exec = seed_staff(&*store, "exec", Role::AdmExec, false).actor();
    let processing = seed_staff(&*store, "processor", Role::Processing, false).actor();
    let media = seed_staff(&*store, "media", Role::Media, false).actor();
    Harness {
        engine: LeadLifecycle::new(store.clone()),
        store,
        admin,
        exec,
        processing,
        media,
    }
}

pub(super) fn seed_staff<R: StaffRepository>(
    repository: &R,
    username: &str,
    role: Role,
    is_staff: bool,
) -> StaffAccount {
    repository
        .insert_staff(NewStaff {
            username: username.to_string(),
            password_hash: Some(test_hasher().hash(PASSWORD).expect("hash")),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            role,
            team: String::new(),
            is_active: true,
            is_staff,
        })
        .expect("seed staff")
}

pub(super) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(64, 1)
}

pub(super) fn submission(phone: &str) -> LeadSubmission {
    LeadSubmission {
        name: "Asha Varma".to_string(),
        phone: phone.to_string(),
        email: None,
        source: LeadSource::Website,
        custom_source: None,
        priority: LeadPriority::Medium,
        program: "Data Science".to_string(),
        location: "Kochi".to_string(),
        remarks: None,
        status: None,
        processing_status: None,
        assigned_to: None,
    }
}

pub(super) fn lead_count(store: &MemoryStore) -> usize {
    store
        .list_leads(&LeadQuery::default())
        .expect("list leads")
        .count
}

/// Fully wired router plus a bearer token per seeded role.
pub(super) struct RouterHarness {
    pub(super) router: Router,
    pub(super) store: Arc<MemoryStore>,
    pub(super) admin_token: String,
    pub(super) exec_token: String,
    pub(super) processing_token: String,
}

pub(super) fn router_harness() -> RouterHarness {
    let store = Arc::new(MemoryStore::new());
    seed_staff(&*store, "admin", Role::Admin, true);
    seed_staff(&*store, "exec", Role::AdmExec, false);
    seed_staff(&*store, "processor", Role::Processing, false);

    let state = ApiState::new(store.clone(), test_hasher(), TokenIssuer::default());
    let token = |username: &str| {
        state
            .auth
            .login(Credentials {
                username: username.to_string(),
                password: PASSWORD.to_string(),
            })
            .expect("login")
            .access
    };
    let admin_token = token("admin");
    let exec_token = token("exec");
    let processing_token = token("processor");

    RouterHarness {
        router: api_router(state),
        store,
        admin_token,
        exec_token,
        processing_token,
    }
}

pub(super) fn json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request")
}

pub(super) fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Sink that refuses every history row.
struct RejectingSink;

impl AuditSink for RejectingSink {
    fn append(&mut self, _entry: crate::audit::AuditEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit log offline".to_string()))
    }
}

/// Memory store whose audit trail cannot accept writes.
#[derive(Default)]
pub(super) struct FailingAuditStore {
    pub(super) inner: MemoryStore,
}

impl LeadRepository for FailingAuditStore {
    fn insert_lead<E, F>(&self, lead: NewLead, audit: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        self.inner
            .insert_lead(lead, |lead, _| audit(lead, &mut RejectingSink))
    }

    fn update_lead<E, F>(&self, id: LeadId, apply: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        self.inner
            .update_lead(id, |lead, _| apply(lead, &mut RejectingSink))
    }

    fn fetch_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        self.inner.fetch_lead(id)
    }

    fn delete_lead(&self, id: LeadId) -> Result<(), RepositoryError> {
        self.inner.delete_lead(id)
    }

    fn list_leads(&self, query: &LeadQuery) -> Result<Page<Lead>, RepositoryError> {
        self.inner.list_leads(query)
    }

    fn phone_in_use(&self, phone: &str, except: Option<LeadId>) -> Result<bool, RepositoryError> {
        self.inner.phone_in_use(phone, except)
    }

    fn email_in_use(&self, email: &str, except: Option<LeadId>) -> Result<bool, RepositoryError> {
        self.inner.email_in_use(email, except)
    }
}

impl AuditRepository for FailingAuditStore {
    fn processing_updates(&self, lead: LeadId) -> Result<Vec<ProcessingUpdate>, RepositoryError> {
        self.inner.processing_updates(lead)
    }

    fn remark_history(&self, lead: LeadId) -> Result<Vec<RemarkHistory>, RepositoryError> {
        self.inner.remark_history(lead)
    }
}

impl StaffRepository for FailingAuditStore {
    fn insert_staff(&self, staff: NewStaff) -> Result<StaffAccount, RepositoryError> {
        self.inner.insert_staff(staff)
    }

    fn update_staff<E, F>(&self, id: StaffId, apply: F) -> Result<StaffAccount, E>
    where
        F: FnOnce(&mut StaffAccount) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        self.inner.update_staff(id, apply)
    }

    fn fetch_staff(&self, id: StaffId) -> Result<Option<StaffAccount>, RepositoryError> {
        self.inner.fetch_staff(id)
    }

    fn find_staff_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StaffAccount>, RepositoryError> {
        self.inner.find_staff_by_username(username)
    }

    fn delete_staff(&self, id: StaffId) -> Result<(), RepositoryError> {
        self.inner.delete_staff(id)
    }

    fn list_staff(&self, query: &StaffQuery) -> Result<Page<StaffAccount>, RepositoryError> {
        self.inner.list_staff(query)
    }
}

/// Write committed by another request between validation and the unit of work.
type ConcurrentWrite = Box<dyn FnOnce(&MemoryStore) + Send>;

/// Memory store that runs one concurrent write just before the next lead
/// write enters its unit of work.
pub(super) struct InterleavingStore {
    pub(super) inner: MemoryStore,
    pending: Mutex<Option<ConcurrentWrite>>,
}

impl InterleavingStore {
    pub(super) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            pending: Mutex::new(None),
        }
    }

    pub(super) fn before_next_write(&self, write: impl FnOnce(&MemoryStore) + Send + 'static) {
        *self.pending.lock().expect("pending lock") = Some(Box::new(write));
    }

    fn run_pending(&self) {
        let pending = self.pending.lock().expect("pending lock").take();
        if let Some(write) = pending {
            write(&self.inner);
        }
    }
}

impl LeadRepository for InterleavingStore {
    fn insert_lead<E, F>(&self, lead: NewLead, audit: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        self.run_pending();
        self.inner.insert_lead(lead, audit)
    }

    fn update_lead<E, F>(&self, id: LeadId, apply: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        self.run_pending();
        self.inner.update_lead(id, apply)
    }

    fn fetch_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        self.inner.fetch_lead(id)
    }

    fn delete_lead(&self, id: LeadId) -> Result<(), RepositoryError> {
        self.inner.delete_lead(id)
    }

    fn list_leads(&self, query: &LeadQuery) -> Result<Page<Lead>, RepositoryError> {
        self.inner.list_leads(query)
    }

    fn phone_in_use(&self, phone: &str, except: Option<LeadId>) -> Result<bool, RepositoryError> {
        self.inner.phone_in_use(phone, except)
    }

    fn email_in_use(&self, email: &str, except: Option<LeadId>) -> Result<bool, RepositoryError> {
        self.inner.email_in_use(email, except)
    }
}

impl AuditRepository for InterleavingStore {
    fn processing_updates(&self, lead: LeadId) -> Result<Vec<ProcessingUpdate>, RepositoryError> {
        self.inner.processing_updates(lead)
    }

    fn remark_history(&self, lead: LeadId) -> Result<Vec<RemarkHistory>, RepositoryError> {
        self.inner.remark_history(lead)
    }
}

impl StaffRepository for InterleavingStore {
    fn insert_staff(&self, staff: NewStaff) -> Result<StaffAccount, RepositoryError> {
        self.inner.insert_staff(staff)
    }

    fn update_staff<E, F>(&self, id: StaffId, apply: F) -> Result<StaffAccount, E>
    where
        F: FnOnce(&mut StaffAccount) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        self.inner.update_staff(id, apply)
    }

    fn fetch_staff(&self, id: StaffId) -> Result<Option<StaffAccount>, RepositoryError> {
        self.inner.fetch_staff(id)
    }

    fn find_staff_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StaffAccount>, RepositoryError> {
        self.inner.find_staff_by_username(username)
    }

    fn delete_staff(&self, id: StaffId) -> Result<(), RepositoryError> {
        self.inner.delete_staff(id)
    }

    fn list_staff(&self, query: &StaffQuery) -> Result<Page<StaffAccount>, RepositoryError> {
        self.inner.list_staff(query)
    }
}

/// Store that is never reachable.
pub(super) struct UnavailableStore;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl LeadRepository for UnavailableStore {
    fn insert_lead<E, F>(&self, _lead: NewLead, _audit: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        Err(offline().into())
    }

    fn update_lead<E, F>(&self, _id: LeadId, _apply: F) -> Result<(Lead, Vec<AuditRecord>), E>
    where
        F: FnOnce(&mut Lead, &mut dyn AuditSink) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        Err(offline().into())
    }

    fn fetch_lead(&self, _id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        Err(offline())
    }

    fn delete_lead(&self, _id: LeadId) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn list_leads(&self, _query: &LeadQuery) -> Result<Page<Lead>, RepositoryError> {
        Err(offline())
    }

    fn phone_in_use(&self, _phone: &str, _except: Option<LeadId>) -> Result<bool, RepositoryError> {
        Err(offline())
    }

    fn email_in_use(&self, _email: &str, _except: Option<LeadId>) -> Result<bool, RepositoryError> {
        Err(offline())
    }
}

impl AuditRepository for UnavailableStore {
    fn processing_updates(&self, _lead: LeadId) -> Result<Vec<ProcessingUpdate>, RepositoryError> {
        Err(offline())
    }

    fn remark_history(&self, _lead: LeadId) -> Result<Vec<RemarkHistory>, RepositoryError> {
        Err(offline())
    }
}

impl StaffRepository for UnavailableStore {
    fn insert_staff(&self, _staff: NewStaff) -> Result<StaffAccount, RepositoryError> {
        Err(offline())
    }

    fn update_staff<E, F>(&self, _id: StaffId, _apply: F) -> Result<StaffAccount, E>
    where
        F: FnOnce(&mut StaffAccount) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        Err(offline().into())
    }

    fn fetch_staff(&self, _id: StaffId) -> Result<Option<StaffAccount>, RepositoryError> {
        Err(offline())
    }

    fn find_staff_by_username(
        &self,
        _username: &str,
    ) -> Result<Option<StaffAccount>, RepositoryError> {
        Err(offline())
    }

    fn delete_staff(&self, _id: StaffId) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn list_staff(&self, _query: &StaffQuery) -> Result<Page<StaffAccount>, RepositoryError> {
        Err(offline())
    }
}
