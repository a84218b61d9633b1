//! Lead records and the lifecycle engine that validates, mutates, and audits
//! them.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Lead, LeadId, LeadListRow, LeadPatch, LeadPriority, LeadSource, LeadStatus, LeadSubmission,
    NewLead, ProcessingStatus, ProcessingUpdateSubmission,
};
pub use repository::{LeadOrdering, LeadQuery, LeadRepository};
pub use router::{lead_routes, LeadListParams};
pub use service::{LeadLifecycle, LeadServiceError};
