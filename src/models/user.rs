use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::require_text;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// 普通用户，只能访问自己的申请
    User,
    /// 管理员
    Admin,
    /// 超级管理员
    Superadmin,
}

impl Role {
    /// 除 USER 以外的角色都视为工作人员
    pub fn is_staff(self) -> bool {
        !matches!(self, Role::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Superadmin => write!(f, "SUPERADMIN"),
        }
    }
}

/// 用户数据库模型
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    /// 当前有效的短信验证码
    pub otp: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    /// 头像URL
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 对外暴露的用户信息（不含密码与验证码）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub image_url: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            is_verified: user.is_verified,
            image_url: user.image_url.clone(),
        }
    }
}

/// 权限判断所需的调用者身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// 新建用户
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password: String,
}

impl RegisterRequest {
    pub const MIN_NAME_LEN: usize = 3;
    pub const MIN_PASSWORD_LEN: usize = 6;

    /// 验证请求参数
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err("email must be a valid email address".to_string());
        }

        if self.name.trim().chars().count() < Self::MIN_NAME_LEN {
            return Err(format!(
                "name must be at least {} characters long",
                Self::MIN_NAME_LEN
            ));
        }

        if self.password.chars().count() < Self::MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {} characters long",
                Self::MIN_PASSWORD_LEN
            ));
        }

        if let Some(phone) = &self.phone {
            require_text(phone, "phone")?;
        }

        Ok(())
    }

    /// 邮箱统一小写，手机号去除首尾空白
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err("email must be a valid email address".to_string());
        }
        require_text(&self.password, "password")
    }
}

/// 发送验证码请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    pub phone: String,
}

impl SendOtpRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.phone, "phone")
    }
}

/// 校验验证码请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
}

impl VerifyOtpRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text(&self.phone, "phone")?;
        require_text(&self.otp, "otp")
    }
}

/// 认证成功响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
}

/// 发送验证码响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendOtpResponse {
    /// 验证码有效期（秒）
    pub expires_in_seconds: i64,
    /// 仅在开发模式下返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

/// 简单的邮箱格式检查
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, name: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            name: name.to_string(),
            phone: Some("+998901234567".to_string()),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@bank.co.uz"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("user@example..com"));
    }

    #[test]
    fn test_register_validation() {
        assert!(register("a@b.uz", "Ali", "secret").validate().is_ok());
        assert!(register("bad", "Ali", "secret").validate().is_err());
        assert!(register("a@b.uz", "Al", "secret").validate().is_err());
        assert!(register("a@b.uz", "Ali", "12345").validate().is_err());
    }

    #[test]
    fn test_register_normalized() {
        let mut req = register("  User@Example.COM ", " Ali ", "secret");
        req.phone = Some("   ".to_string());
        let req = req.normalized();
        assert_eq!(req.email, "user@example.com");
        assert_eq!(req.name, "Ali");
        assert_eq!(req.phone, None);
    }

    #[test]
    fn test_role_is_staff() {
        assert!(!Role::User.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(Role::Superadmin.is_staff());
        assert_eq!(Role::Superadmin.to_string(), "SUPERADMIN");
    }

    #[test]
    fn test_role_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_send_otp_response_hides_code_by_default() {
        let response = SendOtpResponse {
            expires_in_seconds: 120,
            otp: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("otp").is_none());
    }
}
