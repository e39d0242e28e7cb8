use super::AppState;
use crate::response::{ApiResponse, ResponseCode};
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HealthQuery {
    /// 返回版本与时间戳
    #[serde(default)]
    pub detail: bool,
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/health",
    tag = "系统",
    params(HealthQuery),
    responses((status = 200, description = "服务正常"))
)]
pub async fn health_check(Query(params): Query<HealthQuery>) -> ApiResponse<Value> {
    if params.detail {
        ApiResponse::success(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    } else {
        ApiResponse::success(json!({"status": "ok"}))
    }
}

/// 数据库健康检查
#[utoipa::path(
    get,
    path = "/health/db",
    tag = "系统",
    responses(
        (status = 200, description = "数据库正常"),
        (status = 503, description = "数据库不可用")
    )
)]
pub async fn db_health_check(State(app_state): State<AppState>) -> ApiResponse<Value> {
    let Some(db) = &app_state.database else {
        return ApiResponse::error_with_data(
            ResponseCode::SERVICE_UNAVAILABLE,
            "Database is not configured or unreachable".to_string(),
            json!({"status": "unavailable"}),
        );
    };

    match db.health_check().await {
        Ok(true) => ApiResponse::success(json!({
            "database": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
        Ok(false) => ApiResponse::error_with_data(
            ResponseCode::SERVICE_UNAVAILABLE,
            "Database connection is unhealthy".to_string(),
            json!({"status": "unhealthy"}),
        ),
        Err(e) => {
            tracing::error!("数据库健康检查失败: {}", e);
            ApiResponse::error_with_data(
                ResponseCode::SERVICE_UNAVAILABLE,
                "Database health check failed".to_string(),
                json!({"status": "error"}),
            )
        }
    }
}

/// 上传目录健康检查
#[utoipa::path(
    get,
    path = "/health/storage",
    tag = "系统",
    responses(
        (status = 200, description = "上传目录可写"),
        (status = 503, description = "上传目录不可用")
    )
)]
pub async fn storage_health_check(State(app_state): State<AppState>) -> ApiResponse<Value> {
    match app_state.storage.health_check().await {
        Ok(true) => ApiResponse::success(json!({
            "storage": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
        Ok(false) => ApiResponse::error_with_data(
            ResponseCode::SERVICE_UNAVAILABLE,
            "Upload directory is not writable".to_string(),
            json!({"status": "unhealthy"}),
        ),
        Err(e) => {
            tracing::error!("存储健康检查失败: {}", e);
            ApiResponse::error_with_data(
                ResponseCode::SERVICE_UNAVAILABLE,
                "Storage health check failed".to_string(),
                json!({"status": "error"}),
            )
        }
    }
}

/// 系统信息
#[utoipa::path(
    get,
    path = "/api/system/info",
    tag = "系统",
    responses((status = 200, description = "系统信息"))
)]
pub async fn system_info(State(app_state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "LoanDesk Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "database": app_state.database.is_some(),
        "identity_provider": app_state.identity_provider.name(),
        "max_image_size": app_state.config.upload.max_image_size,
        "max_video_size": app_state.config.upload.max_video_size,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Swagger UI 页面，文档数据来自 /api-docs/openapi.json
pub async fn swagger_ui_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset=UTF-8>
  <title>LoanDesk API 文档</title>
  <link rel=stylesheet href=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui.css>
  <style>
    body { margin: 0; font-family: Arial, sans-serif; }
  </style>
</head>
<body>
  <div id=swagger-ui>
    <div style="padding: 50px; text-align: center;">正在加载 API 文档...</div>
  </div>
  <script src=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui-bundle.js></script>
  <script src=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui-standalone-preset.js></script>
  <script>
    window.onload = function() {
      window.ui = SwaggerUIBundle({
        url: '/api-docs/openapi.json',
        dom_id: '#swagger-ui',
        deepLinking: true,
        presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
        layout: 'StandaloneLayout',
        validatorUrl: null
      });
    };
  </script>
</body>
</html>"#,
    )
}
