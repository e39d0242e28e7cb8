pub mod application;
pub mod branch;
pub mod myid;
pub mod product;
pub mod user;

pub use application::*;
pub use branch::*;
pub use myid::*;
pub use product::*;
pub use user::*;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 分页参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// 由查询参数构建，页码从1开始，页大小限制在 1..=100
    pub fn from_query(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(Self::DEFAULT_PAGE_SIZE)
                .clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: &Pagination) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            ((total as f64) / (pagination.page_size as f64)).ceil() as u32
        };

        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages,
        }
    }
}

/// 必填文本字段校验
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(())
}

/// 可选文本字段校验：出现时不能为空白
pub(crate) fn optional_text(value: Option<&str>, field: &str) -> Result<(), String> {
    match value {
        Some(v) => require_text(v, field),
        None => Ok(()),
    }
}

/// 非负数值校验
pub(crate) fn non_negative(value: Option<f64>, field: &str) -> Result<(), String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(format!("{} must be a non-negative number", field))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_from_query() {
        let p = Pagination::from_query(None, None);
        assert_eq!((p.page, p.page_size), (1, 20));

        let p = Pagination::from_query(Some(0), Some(500));
        assert_eq!((p.page, p.page_size), (1, 100));

        let p = Pagination::from_query(Some(3), Some(10));
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn test_paged_result_total_pages() {
        let p = Pagination::from_query(Some(1), Some(10));
        let result = PagedResult::new(vec![1, 2, 3], 21, &p);
        assert_eq!(result.total_pages, 3);

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &p);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_field_validators() {
        assert!(require_text("  ", "title").is_err());
        assert!(require_text("Loan", "title").is_ok());
        assert!(optional_text(None, "notes").is_ok());
        assert!(optional_text(Some(""), "notes").is_err());
        assert!(non_negative(Some(-1.0), "amount").is_err());
        assert!(non_negative(Some(f64::NAN), "amount").is_err());
        assert!(non_negative(Some(0.0), "amount").is_ok());
    }
}
