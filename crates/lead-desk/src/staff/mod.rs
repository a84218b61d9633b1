//! Operator accounts: CRUD, credential hashing, and list views.

pub mod domain;
pub mod password;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    NewStaff, StaffAccount, StaffDetail, StaffId, StaffIdentity, StaffInput, StaffOrdering,
    StaffPatch, StaffQuery, StaffSummary,
};
pub use password::{PasswordHash, PasswordHashError, PasswordHasher};
pub use repository::StaffRepository;
pub use router::staff_routes;
pub use service::{StaffDirectory, StaffServiceError};
