use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{non_negative, optional_text, require_text};

/// 贷款产品
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// 年利率（百分比）
    pub interest_rate: Option<f64>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// 期限（月）
    pub term_months: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建产品请求
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub interest_rate: Option<f64>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub term_months: Option<i32>,
    pub is_active: Option<bool>,
}

impl CreateProductRequest {
    /// 验证请求参数
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.name, "name")?;
        check_numbers(
            self.interest_rate,
            self.min_amount,
            self.max_amount,
            self.term_months,
        )
    }
}

/// 更新产品请求
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub interest_rate: Option<f64>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub term_months: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateProductRequest {
    /// 验证请求参数（金额区间需结合现有记录，见 `merged_range`）
    pub fn validate(&self) -> Result<(), String> {
        optional_text(self.name.as_deref(), "name")?;
        check_numbers(
            self.interest_rate,
            self.min_amount,
            self.max_amount,
            self.term_months,
        )
    }

    /// 合并后的金额区间
    pub fn merged_range(&self, current: &Product) -> (Option<f64>, Option<f64>) {
        (
            self.min_amount.or(current.min_amount),
            self.max_amount.or(current.max_amount),
        )
    }
}

/// 产品查询过滤器
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub is_active: Option<bool>,
    pub category: Option<String>,
}

fn check_numbers(
    interest_rate: Option<f64>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    term_months: Option<i32>,
) -> Result<(), String> {
    non_negative(interest_rate, "interest_rate")?;
    non_negative(min_amount, "min_amount")?;
    non_negative(max_amount, "max_amount")?;
    if matches!(term_months, Some(t) if t < 0) {
        return Err("term_months must be a non-negative number".to_string());
    }
    check_amount_range(min_amount, max_amount)
}

/// 最小金额不得大于最大金额
pub fn check_amount_range(min_amount: Option<f64>, max_amount: Option<f64>) -> Result<(), String> {
    match (min_amount, max_amount) {
        (Some(min), Some(max)) if min > max => {
            Err("min_amount must not exceed max_amount".to_string())
        }
        _ => Ok(()),
    }
}
