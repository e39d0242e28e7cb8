use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::require_text;

/// MyID 身份核验记录（每个用户一条）
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MyId {
    pub id: i32,
    pub user_id: i32,
    pub response_id: String,
    /// 人脸比对相似度
    pub comparison_value: Option<f64>,
    pub passport_series: Option<String>,
    pub passport_number: Option<String>,
    pub full_name: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub nationality: Option<String>,
    /// 提供方返回的其余资料
    pub profile: Option<serde_json::Value>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 身份核验提供方返回的资料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyIdProfile {
    pub response_id: String,
    pub comparison_value: Option<f64>,
    pub passport_series: Option<String>,
    pub passport_number: Option<String>,
    pub full_name: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub nationality: Option<String>,
    #[serde(default)]
    pub profile: Option<serde_json::Value>,
}

/// 核验结果摘要
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MyIdSummary {
    pub full_name: Option<String>,
    pub passport_series: Option<String>,
    pub passport_number: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub is_verified: bool,
}

impl From<MyId> for MyIdSummary {
    fn from(record: MyId) -> Self {
        Self {
            full_name: record.full_name,
            passport_series: record.passport_series,
            passport_number: record.passport_number,
            birth_date: record.birth_date,
            address: record.address,
            is_verified: record.is_verified,
        }
    }
}

/// MyID 核验请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyMyIdRequest {
    /// MyID 授权码
    pub code: String,
}

impl VerifyMyIdRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.code, "code")
    }
}
