use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::{ApiResponse, ResponseCode};

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移错误: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("文件过大: 最大允许大小 {max_size} 字节")]
    FileTooLarge { max_size: u64 },

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("服务不可用: {0}")]
    ServiceUnavailable(String),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未认证: {0}")]
    Unauthorized(String),

    #[error("无权限: {0}")]
    Forbidden(String),

    #[error("资源不存在: {resource}")]
    NotFound { resource: String },
}

impl AppError {
    /// 对应的业务响应码与对外消息
    fn code_and_message(&self) -> (i32, String) {
        match self {
            AppError::Database(_) | AppError::Migration(_) => {
                (ResponseCode::DATABASE_ERROR, "Database error".to_string())
            }
            AppError::Serialization(_) => (
                ResponseCode::INTERNAL_ERROR,
                "Serialization error".to_string(),
            ),
            AppError::Io(_) => (ResponseCode::INTERNAL_ERROR, "File IO error".to_string()),
            AppError::Config(_) => (
                ResponseCode::INTERNAL_ERROR,
                "Configuration error".to_string(),
            ),
            AppError::Validation(msg) => (ResponseCode::BAD_REQUEST, msg.clone()),
            AppError::Storage(_) => (ResponseCode::STORAGE_ERROR, "Storage error".to_string()),
            AppError::FileTooLarge { max_size } => (
                ResponseCode::FILE_TOO_LARGE,
                format!("File too large, maximum allowed size: {} MB", max_size / 1024 / 1024),
            ),
            AppError::Internal(_) => (
                ResponseCode::INTERNAL_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::ServiceUnavailable(msg) => (ResponseCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::BadRequest(msg) => (ResponseCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (ResponseCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (ResponseCode::FORBIDDEN, msg.clone()),
            AppError::NotFound { resource } => (ResponseCode::NOT_FOUND, resource.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = self.code_and_message();

        // 记录错误日志：客户端错误降级为 warn
        if code >= ResponseCode::INTERNAL_ERROR {
            tracing::error!("应用错误: {}", self);
        } else {
            tracing::warn!("请求被拒绝: {}", self);
        }

        ApiResponse::<()>::error(code, message).into_response()
    }
}

/// 应用程序Result类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误构造辅助函数
impl AppError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn service_unavailable<T: Into<String>>(msg: T) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn file_too_large(max_size: u64) -> Self {
        Self::FileTooLarge { max_size }
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// 唯一约束冲突（Postgres 23505）
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_creation() {
        let err = AppError::validation("title must not be empty");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "验证错误: title must not be empty");
    }

    #[test]
    fn test_file_too_large_error() {
        let err = AppError::file_too_large(5 * 1024 * 1024);
        assert!(matches!(err, AppError::FileTooLarge { .. }));
        let (code, msg) = err.code_and_message();
        assert_eq!(code, ResponseCode::FILE_TOO_LARGE);
        assert!(msg.contains("5 MB"));
    }

    #[test]
    fn test_not_found_error() {
        let err = AppError::not_found("Application with ID 7 not found");
        let (code, msg) = err.code_and_message();
        assert_eq!(code, ResponseCode::NOT_FOUND);
        assert_eq!(msg, "Application with ID 7 not found");
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (AppError::forbidden("no"), StatusCode::FORBIDDEN),
            (AppError::unauthorized("no"), StatusCode::UNAUTHORIZED),
            (AppError::bad_request("no"), StatusCode::BAD_REQUEST),
            (AppError::not_found("no"), StatusCode::NOT_FOUND),
            (AppError::file_too_large(1), StatusCode::PAYLOAD_TOO_LARGE),
            (
                AppError::service_unavailable("no"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::Internal(anyhow::anyhow!("secret connection string"));
        let (_, msg) = err.code_and_message();
        assert_eq!(msg, "Internal server error");
    }
}
