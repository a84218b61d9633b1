use super::domain::{NewStaff, StaffAccount, StaffId, StaffQuery};
use crate::store::{Page, RepositoryError};

/// Storage abstraction for operator accounts. Usernames are unique; the store
/// answers a clashing insert or rename with `Conflict { field: "username" }`.
pub trait StaffRepository: Send + Sync {
    fn insert_staff(&self, staff: NewStaff) -> Result<StaffAccount, RepositoryError>;

    fn update_staff<E, F>(&self, id: StaffId, apply: F) -> Result<StaffAccount, E>
    where
        F: FnOnce(&mut StaffAccount) -> Result<(), E>,
        E: From<RepositoryError>;

    fn fetch_staff(&self, id: StaffId) -> Result<Option<StaffAccount>, RepositoryError>;

    fn find_staff_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StaffAccount>, RepositoryError>;

    fn delete_staff(&self, id: StaffId) -> Result<(), RepositoryError>;

    fn list_staff(&self, query: &StaffQuery) -> Result<Page<StaffAccount>, RepositoryError>;
}
