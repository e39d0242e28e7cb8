use crate::{
    error::{AppError, AppResult},
    handlers::AppState,
    models::{Actor, UserProfile},
    repositories::UserRepository,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

/// 已认证的当前用户。
///
/// 从 `Authorization: Bearer <token>` 中取出令牌，校验后按令牌中的用户ID
/// 重新加载用户，用户已被删除时拒绝请求。
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserProfile);

impl AuthUser {
    /// 权限判断使用的身份
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.0.id,
            role: self.0.role,
        }
    }

    /// 仅允许 USER 以外的角色
    pub fn require_staff(&self) -> AppResult<()> {
        if self.0.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "Insufficient permissions for this operation",
            ))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.jwt.verify(token)?;
        let user_id = claims.user_id()?;

        let repo = UserRepository::new(state.db()?.clone());
        let user = repo.find_by_id(user_id).await?.ok_or_else(|| {
            tracing::warn!("令牌对应的用户不存在: {}", user_id);
            AppError::unauthorized("User not found")
        })?;

        Ok(AuthUser(UserProfile::from(&user)))
    }
}

/// 解析 Bearer 令牌
fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::unauthorized(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
            )
        })
}
