pub mod articles;
pub mod catalog;
pub mod database_admin;
pub mod menu;
pub mod price_rules;
pub mod pricing;
pub mod societes;

use crate::errors::ServiceError;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

/// 1-based page request, already clamped to the configured page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    /// Zero-based page index for sea-orm paginators
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Turns unique-constraint violations into 409s, everything else into a database error
pub(crate) fn map_write_error(err: DbErr, what: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict(format!("{} already exists", what))
        }
        _ => ServiceError::db_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_is_one_based() {
        let req = PageRequest::new(None, 20);
        assert_eq!(req.page, 1);
        assert_eq!(req.index(), 0);
        assert_eq!(PageRequest::new(Some(0), 0), PageRequest { page: 1, per_page: 1 });
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page {
            items: vec![1, 2],
            total: 41,
            page: 1,
            per_page: 20,
        };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.map(|i| i * 2).items, vec![2, 4]);
    }
}
