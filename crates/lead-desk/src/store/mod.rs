//! Persistence contracts shared by the lead, audit, staff, and token repositories.

mod memory;

use serde::{Deserialize, Serialize};

use crate::audit::AuditRepository;
use crate::auth::TokenRepository;
use crate::leads::LeadRepository;
use crate::staff::StaffRepository;

pub use memory::MemoryStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness constraint on `field` rejected the write.
    #[error("duplicate value for unique field `{field}`")]
    Conflict { field: &'static str },
    /// A foreign key on `field` names a record that does not exist.
    #[error("`{field}` references missing record {id}")]
    MissingReference { field: &'static str, id: u64 },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Everything the HTTP surface needs from a single backing store.
pub trait Store:
    LeadRepository + AuditRepository + StaffRepository + TokenRepository + 'static
{
}

impl<T> Store for T where
    T: LeadRepository + AuditRepository + StaffRepository + TokenRepository + 'static
{
}

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// 1-based page selector, clamped to `MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Slice one page out of an already filtered and ordered result set.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let count = items.len();
        let offset = (self.page - 1).saturating_mul(self.page_size);
        let results = items
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();
        Page {
            count,
            page: self.page,
            page_size: self.page_size,
            results,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Case-insensitive substring match used by list `search` parameters.
pub(crate) fn matches_search(term: &str, haystacks: &[&str]) -> bool {
    let needle = term.trim().to_lowercase();
    needle.is_empty()
        || haystacks
            .iter()
            .any(|value| value.to_lowercase().contains(&needle))
}
