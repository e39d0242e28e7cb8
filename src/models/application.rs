use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{Actor, non_negative, optional_text, require_text};
use crate::error::{AppError, AppResult};

/// 申请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "application_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    /// 待审核
    Pending,
    /// 已批准
    Approved,
    /// 已拒绝
    Rejected,
    /// 处理中
    Processing,
    /// 已完成
    Completed,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Processing => "PROCESSING",
            ApplicationStatus::Completed => "COMPLETED",
        }
    }

    /// 是否允许上传视频
    pub fn accepts_video(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending | ApplicationStatus::Processing
        )
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 申请数据模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Application {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// 申请金额
    pub amount: Option<f64>,
    pub notes: Option<String>,
    pub status: ApplicationStatus,
    /// 附带视频的访问URL
    pub video_url: Option<String>,
    /// 申请人
    pub user_id: i32,
    /// 受理网点
    pub branch_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    fn is_owned_by(&self, actor: &Actor) -> bool {
        self.user_id == actor.id
    }

    /// 普通用户只能查看自己的申请
    pub fn ensure_readable_by(&self, actor: &Actor) -> AppResult<()> {
        if !actor.is_staff() && !self.is_owned_by(actor) {
            return Err(AppError::forbidden(
                "You can only view your own applications",
            ));
        }
        Ok(())
    }

    /// 普通用户只能修改自己处于待审核状态的申请
    pub fn ensure_updatable_by(&self, actor: &Actor) -> AppResult<()> {
        if actor.is_staff() {
            return Ok(());
        }
        if !self.is_owned_by(actor) {
            return Err(AppError::forbidden(
                "You can only update your own applications",
            ));
        }
        if self.status != ApplicationStatus::Pending {
            return Err(AppError::forbidden(
                "You can only update pending applications",
            ));
        }
        Ok(())
    }

    /// 普通用户只能删除自己处于待审核状态的申请
    pub fn ensure_deletable_by(&self, actor: &Actor) -> AppResult<()> {
        if actor.is_staff() {
            return Ok(());
        }
        if !self.is_owned_by(actor) {
            return Err(AppError::forbidden(
                "You can only delete your own applications",
            ));
        }
        if self.status != ApplicationStatus::Pending {
            return Err(AppError::forbidden(
                "You can only delete pending applications",
            ));
        }
        Ok(())
    }

    /// 视频只能上传到待审核或处理中的申请；普通用户还需是申请人
    pub fn ensure_video_uploadable_by(&self, actor: &Actor) -> AppResult<()> {
        if !actor.is_staff() && !self.is_owned_by(actor) {
            return Err(AppError::forbidden(
                "You can only upload video to your own applications",
            ));
        }
        if !self.status.accepts_video() {
            return Err(AppError::forbidden(format!(
                "Cannot upload video for {} applications",
                self.status.as_str().to_lowercase()
            )));
        }
        Ok(())
    }
}

/// 申请人摘要
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// 受理网点摘要
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationBranch {
    pub id: i32,
    pub name: String,
    pub city: String,
    /// 仅详情接口返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// 带关联信息的申请
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub user: ApplicationUser,
    pub branch: Option<ApplicationBranch>,
}

/// 申请联表查询行
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    #[sqlx(flatten)]
    pub application: Application,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub branch_name: Option<String>,
    pub branch_city: Option<String>,
    pub branch_address: Option<String>,
    pub branch_phone: Option<String>,
}

impl ApplicationRow {
    /// 转换为响应结构；`with_branch_contacts` 控制是否带出网点地址与电话
    pub fn into_detail(self, with_branch_contacts: bool) -> ApplicationDetail {
        let user = ApplicationUser {
            id: self.application.user_id,
            name: self.user_name,
            email: self.user_email,
            phone: self.user_phone,
        };

        let branch = match (self.application.branch_id, self.branch_name, self.branch_city) {
            (Some(id), Some(name), Some(city)) => Some(ApplicationBranch {
                id,
                name,
                city,
                address: self.branch_address.filter(|_| with_branch_contacts),
                phone: self.branch_phone.filter(|_| with_branch_contacts),
            }),
            _ => None,
        };

        ApplicationDetail {
            application: self.application,
            user,
            branch,
        }
    }
}

/// 创建申请请求
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    pub title: String,
    pub description: String,
    pub branch_id: Option<i32>,
    pub amount: Option<f64>,
    pub notes: Option<String>,
}

impl CreateApplicationRequest {
    /// 验证请求参数
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "title")?;
        require_text(&self.description, "description")?;
        non_negative(self.amount, "amount")?;
        if let Some(branch_id) = self.branch_id {
            if branch_id <= 0 {
                return Err("branch_id must be a positive integer".to_string());
            }
        }
        Ok(())
    }
}

/// 更新申请请求
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateApplicationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub amount: Option<f64>,
    pub notes: Option<String>,
}

impl UpdateApplicationRequest {
    /// 验证请求参数
    pub fn validate(&self) -> Result<(), String> {
        optional_text(self.title.as_deref(), "title")?;
        optional_text(self.description.as_deref(), "description")?;
        non_negative(self.amount, "amount")
    }

    /// 普通用户不能修改状态，忽略该字段
    pub fn restricted_to(mut self, actor: &Actor) -> Self {
        if !actor.is_staff() {
            self.status = None;
        }
        self
    }
}

/// 申请查询过滤器
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// 仅返回该用户的申请
    pub user_id: Option<i32>,
    pub status: Option<ApplicationStatus>,
    pub branch_id: Option<i32>,
}

impl ApplicationFilter {
    /// 普通用户的列表自动限定为本人
    pub fn scoped_to(mut self, actor: &Actor) -> Self {
        if !actor.is_staff() {
            self.user_id = Some(actor.id);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    const OWNER: Actor = Actor {
        id: 1,
        role: Role::User,
    };
    const STRANGER: Actor = Actor {
        id: 2,
        role: Role::User,
    };
    const ADMIN: Actor = Actor {
        id: 99,
        role: Role::Admin,
    };

    fn application(status: ApplicationStatus) -> Application {
        let now = Utc::now();
        Application {
            id: 10,
            title: "Car loan".to_string(),
            description: "Need a car".to_string(),
            amount: Some(15_000.0),
            notes: None,
            status,
            video_url: None,
            user_id: OWNER.id,
            branch_id: Some(3),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_non_owner_user_cannot_touch_application() {
        let app = application(ApplicationStatus::Pending);
        assert!(matches!(
            app.ensure_readable_by(&STRANGER),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            app.ensure_updatable_by(&STRANGER),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            app.ensure_deletable_by(&STRANGER),
            Err(AppError::Forbidden(_))
        ));
        assert!(app.ensure_video_uploadable_by(&STRANGER).is_err());
    }

    #[test]
    fn test_owner_can_modify_pending_application() {
        let app = application(ApplicationStatus::Pending);
        assert!(app.ensure_readable_by(&OWNER).is_ok());
        assert!(app.ensure_updatable_by(&OWNER).is_ok());
        assert!(app.ensure_deletable_by(&OWNER).is_ok());
        assert!(app.ensure_video_uploadable_by(&OWNER).is_ok());
    }

    #[test]
    fn test_owner_cannot_modify_once_status_leaves_pending() {
        for status in [
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::Processing,
            ApplicationStatus::Completed,
        ] {
            let app = application(status);
            assert!(app.ensure_readable_by(&OWNER).is_ok());
            match app.ensure_updatable_by(&OWNER) {
                Err(AppError::Forbidden(msg)) => {
                    assert_eq!(msg, "You can only update pending applications")
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert!(app.ensure_deletable_by(&OWNER).is_err());
        }
    }

    #[test]
    fn test_staff_bypasses_ownership_and_status() {
        let app = application(ApplicationStatus::Approved);
        assert!(app.ensure_readable_by(&ADMIN).is_ok());
        assert!(app.ensure_updatable_by(&ADMIN).is_ok());
        assert!(app.ensure_deletable_by(&ADMIN).is_ok());
    }

    #[test]
    fn test_video_upload_allowed_only_while_pending_or_processing() {
        assert!(
            application(ApplicationStatus::Processing)
                .ensure_video_uploadable_by(&OWNER)
                .is_ok()
        );

        match application(ApplicationStatus::Rejected).ensure_video_uploadable_by(&ADMIN) {
            Err(AppError::Forbidden(msg)) => {
                assert_eq!(msg, "Cannot upload video for rejected applications")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_user_cannot_change_status() {
        let request = UpdateApplicationRequest {
            status: Some(ApplicationStatus::Approved),
            title: Some("New title".to_string()),
            ..Default::default()
        };

        let for_user = request.clone().restricted_to(&OWNER);
        assert_eq!(for_user.status, None);
        assert_eq!(for_user.title.as_deref(), Some("New title"));

        let for_admin = request.restricted_to(&ADMIN);
        assert_eq!(for_admin.status, Some(ApplicationStatus::Approved));
    }

    #[test]
    fn test_filter_scoped_to_user() {
        let filter = ApplicationFilter::default().scoped_to(&OWNER);
        assert_eq!(filter.user_id, Some(OWNER.id));

        let filter = ApplicationFilter::default().scoped_to(&ADMIN);
        assert_eq!(filter.user_id, None);
    }

    #[test]
    fn test_create_request_validation() {
        let mut request = CreateApplicationRequest {
            title: "Mortgage".to_string(),
            description: "Two-room flat".to_string(),
            ..Default::default()
        };
        assert!(request.validate().is_ok());

        request.amount = Some(-5.0);
        assert!(request.validate().is_err());

        request.amount = None;
        request.title = " ".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_row_into_detail_hides_branch_contacts_in_lists() {
        let row = ApplicationRow {
            application: application(ApplicationStatus::Pending),
            user_name: "Ali".to_string(),
            user_email: "ali@example.com".to_string(),
            user_phone: None,
            branch_name: Some("Chilonzor".to_string()),
            branch_city: Some("Toshkent".to_string()),
            branch_address: Some("Bunyodkor 1".to_string()),
            branch_phone: Some("+99871".to_string()),
        };

        let list_item = row.clone().into_detail(false);
        let branch = list_item.branch.unwrap();
        assert_eq!(branch.id, 3);
        assert!(branch.address.is_none());

        let detail = row.into_detail(true);
        assert_eq!(detail.branch.unwrap().address.as_deref(), Some("Bunyodkor 1"));
        assert_eq!(detail.user.id, OWNER.id);
    }

    #[test]
    fn test_status_serde() {
        let status: ApplicationStatus = serde_json::from_str("\"PROCESSING\"").unwrap();
        assert_eq!(status, ApplicationStatus::Processing);
        assert!(serde_json::from_str::<ApplicationStatus>("\"UNKNOWN\"").is_err());
    }
}
