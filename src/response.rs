use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 统一API响应格式
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// 业务响应码
    pub code: i32,
    /// 响应消息
    pub msg: String,
    /// 响应数据
    pub data: Option<T>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: ResponseCode::SUCCESS,
            msg: ResponseCode::get_message(ResponseCode::SUCCESS).to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message<M: Into<String>>(data: T, msg: M) -> Self {
        Self {
            code: ResponseCode::SUCCESS,
            msg: msg.into(),
            data: Some(data),
        }
    }

    /// 创建成功响应（无数据）
    pub fn success_empty<M: Into<String>>(msg: M) -> ApiResponse<()> {
        ApiResponse {
            code: ResponseCode::SUCCESS,
            msg: msg.into(),
            data: None,
        }
    }

    /// 创建错误响应
    pub fn error(code: i32, msg: String) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg,
            data: None,
        }
    }

    /// 创建错误响应（带数据）
    pub fn error_with_data(code: i32, msg: String, data: T) -> Self {
        Self {
            code,
            msg,
            data: Some(data),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (ResponseCode::http_status(self.code), Json(self)).into_response()
    }
}

/// 业务响应码常量
pub struct ResponseCode;

impl ResponseCode {
    /// 成功响应码
    pub const SUCCESS: i32 = 200;

    /// 客户端错误 4xx
    pub const BAD_REQUEST: i32 = 400;
    pub const UNAUTHORIZED: i32 = 401;
    pub const FORBIDDEN: i32 = 403;
    pub const NOT_FOUND: i32 = 404;
    pub const FILE_TOO_LARGE: i32 = 413;

    /// 服务器错误 5xx
    pub const INTERNAL_ERROR: i32 = 500;
    pub const DATABASE_ERROR: i32 = 501;
    pub const STORAGE_ERROR: i32 = 502;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

impl ResponseCode {
    /// 业务响应码对应的HTTP状态码
    pub fn http_status(code: i32) -> StatusCode {
        match code {
            Self::SUCCESS => StatusCode::OK,
            Self::BAD_REQUEST => StatusCode::BAD_REQUEST,
            Self::UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            Self::FORBIDDEN => StatusCode::FORBIDDEN,
            Self::NOT_FOUND => StatusCode::NOT_FOUND,
            Self::FILE_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 响应码对应的默认消息
    pub fn get_message(code: i32) -> &'static str {
        match code {
            Self::SUCCESS => "Success",
            Self::BAD_REQUEST => "Bad request",
            Self::UNAUTHORIZED => "Unauthorized",
            Self::FORBIDDEN => "Forbidden",
            Self::NOT_FOUND => "Not found",
            Self::FILE_TOO_LARGE => "File too large",
            Self::INTERNAL_ERROR => "Internal server error",
            Self::DATABASE_ERROR => "Database error",
            Self::STORAGE_ERROR => "Storage error",
            Self::SERVICE_UNAVAILABLE => "Service unavailable",
            _ => "Unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_response() {
        let response = ApiResponse::success(json!({"id": 1, "name": "test"}));
        assert_eq!(response.code, 200);
        assert_eq!(response.msg, "Success");
        assert!(response.data.is_some());
    }

    #[test]
    fn test_success_with_message() {
        let response = ApiResponse::success_with_message(json!({}), "Login successful");
        assert_eq!(response.code, 200);
        assert_eq!(response.msg, "Login successful");
    }

    #[test]
    fn test_error_response() {
        let response = ApiResponse::<()>::error(403, "Forbidden here".to_string());
        assert_eq!(response.code, 403);
        assert_eq!(response.msg, "Forbidden here");
        assert!(response.data.is_none());
        assert_eq!(response.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_response_code_message() {
        assert_eq!(ResponseCode::get_message(200), "Success");
        assert_eq!(ResponseCode::get_message(404), "Not found");
        assert_eq!(ResponseCode::get_message(999), "Unknown error");
    }

    #[test]
    fn test_database_error_maps_to_500() {
        assert_eq!(
            ResponseCode::http_status(ResponseCode::DATABASE_ERROR),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
