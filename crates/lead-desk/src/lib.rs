//! Lead intake and processing service.
//!
//! Leads move through a qualification `status` and an operational
//! `processing_status`. Every processing-status move and every remarks edit is
//! appended to an immutable audit trail in the same unit of work as the change
//! itself. Staff accounts, bearer-token login, and a flat role capability table
//! gate access to the HTTP surface.

pub mod access;
pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod leads;
pub mod staff;
pub mod store;
pub mod telemetry;
pub mod validation;
