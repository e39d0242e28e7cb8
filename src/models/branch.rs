use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{Application, optional_text, require_text};

/// 网点所在地区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "region", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Andijon,
    Buxoro,
    Fargona,
    Jizzax,
    Xorazm,
    Namangan,
    Navoiy,
    Qashqadaryo,
    Qoraqalpoq,
    Samarqand,
    Sirdaryo,
    Surxondaryo,
    Toshkent,
    ToshkentShahar,
}

impl Region {
    pub const ALL: [Region; 14] = [
        Region::Andijon,
        Region::Buxoro,
        Region::Fargona,
        Region::Jizzax,
        Region::Xorazm,
        Region::Namangan,
        Region::Navoiy,
        Region::Qashqadaryo,
        Region::Qoraqalpoq,
        Region::Samarqand,
        Region::Sirdaryo,
        Region::Surxondaryo,
        Region::Toshkent,
        Region::ToshkentShahar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Andijon => "ANDIJON",
            Region::Buxoro => "BUXORO",
            Region::Fargona => "FARGONA",
            Region::Jizzax => "JIZZAX",
            Region::Xorazm => "XORAZM",
            Region::Namangan => "NAMANGAN",
            Region::Navoiy => "NAVOIY",
            Region::Qashqadaryo => "QASHQADARYO",
            Region::Qoraqalpoq => "QORAQALPOQ",
            Region::Samarqand => "SAMARQAND",
            Region::Sirdaryo => "SIRDARYO",
            Region::Surxondaryo => "SURXONDARYO",
            Region::Toshkent => "TOSHKENT",
            Region::ToshkentShahar => "TOSHKENT_SHAHAR",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.as_str() == upper)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Region::ALL.iter().map(Region::as_str).collect();
                format!("region must be one of: {}", allowed.join(", "))
            })
    }
}

/// 网点数据模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Branch {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub city: String,
    pub region: Region,
    /// 网点负责人（用户ID）
    pub manager_id: Option<i32>,
    /// 网点图片URL
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 网点负责人摘要
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchManager {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// 网点列表项
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchListItem {
    #[serde(flatten)]
    pub branch: Branch,
    pub manager: Option<BranchManager>,
    /// 该网点受理的申请数量
    pub applications_count: i64,
}

/// 网点详情
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchDetail {
    #[serde(flatten)]
    pub branch: Branch,
    pub manager: Option<BranchManager>,
    /// 最近的申请
    pub applications: Vec<Application>,
}

/// 网点联表查询行
#[derive(Debug, Clone, FromRow)]
pub struct BranchRow {
    #[sqlx(flatten)]
    pub branch: Branch,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub manager_phone: Option<String>,
    pub applications_count: i64,
}

impl BranchRow {
    fn manager(&self, with_phone: bool) -> Option<BranchManager> {
        match (self.branch.manager_id, &self.manager_name, &self.manager_email) {
            (Some(id), Some(name), Some(email)) => Some(BranchManager {
                id,
                name: name.clone(),
                email: email.clone(),
                phone: self.manager_phone.clone().filter(|_| with_phone),
            }),
            _ => None,
        }
    }

    pub fn into_list_item(self) -> BranchListItem {
        BranchListItem {
            manager: self.manager(false),
            applications_count: self.applications_count,
            branch: self.branch,
        }
    }

    pub fn into_detail(self, applications: Vec<Application>) -> BranchDetail {
        BranchDetail {
            manager: self.manager(true),
            branch: self.branch,
            applications,
        }
    }
}

/// 负责人变更方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerChange {
    /// 保持不变
    #[default]
    Keep,
    /// 指定新的负责人
    Set(i32),
    /// 解除负责人
    Clear,
}

impl ManagerChange {
    /// 解析表单字段：空值或 0 表示解除
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "0" || raw.eq_ignore_ascii_case("null") {
            return Ok(ManagerChange::Clear);
        }
        match raw.parse::<i32>() {
            Ok(id) if id > 0 => Ok(ManagerChange::Set(id)),
            _ => Err("manager_id must be a positive integer".to_string()),
        }
    }

    pub fn manager_id(&self) -> Option<i32> {
        match self {
            ManagerChange::Set(id) => Some(*id),
            _ => None,
        }
    }
}

/// 创建网点请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBranchRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub city: String,
    pub region: Region,
    pub manager_id: Option<i32>,
    pub is_active: Option<bool>,
}

impl CreateBranchRequest {
    /// 验证请求参数
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.name, "name")?;
        require_text(&self.address, "address")?;
        require_text(&self.phone, "phone")?;
        require_text(&self.city, "city")?;
        if let Some(manager_id) = self.manager_id {
            if manager_id <= 0 {
                return Err("manager_id must be a positive integer".to_string());
            }
        }
        Ok(())
    }
}

/// 更新网点请求
#[derive(Debug, Clone, Default)]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub region: Option<Region>,
    pub manager: ManagerChange,
    pub is_active: Option<bool>,
}

impl UpdateBranchRequest {
    /// 验证请求参数
    pub fn validate(&self) -> Result<(), String> {
        optional_text(self.name.as_deref(), "name")?;
        optional_text(self.address.as_deref(), "address")?;
        optional_text(self.phone.as_deref(), "phone")?;
        optional_text(self.city.as_deref(), "city")
    }
}

/// 网点查询过滤器
#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    pub region: Option<Region>,
    pub is_active: Option<bool>,
}
