use crate::{
    docs::ApiDoc,
    handlers::{
        AppState, create_application, create_branch, create_product, db_health_check,
        delete_application, delete_branch, delete_product, get_application, get_branch,
        get_product, health_check, list_applications, list_branches, list_products, login,
        profile, register, send_otp, storage_health_check, swagger_ui_page, system_info,
        update_application, update_branch, update_product, upload_application_video,
        upload_avatar, verify_myid, verify_otp,
    },
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    response::Json,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// 创建业务API路由
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        // 认证
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/verify-myid", post(verify_myid))
        .route("/auth/profile", get(profile))
        .route("/auth/upload-avatar", patch(upload_avatar))
        // 申请
        .route(
            "/applications",
            get(list_applications).post(create_application),
        )
        .route(
            "/applications/{id}",
            get(get_application)
                .patch(update_application)
                .delete(delete_application),
        )
        .route(
            "/applications/{id}/upload-video",
            patch(upload_application_video),
        )
        // 网点
        .route("/branches", get(list_branches).post(create_branch))
        .route(
            "/branches/{id}",
            get(get_branch).patch(update_branch).delete(delete_branch),
        )
        // 产品
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

/// 组装完整应用：系统路由、业务路由、静态上传目录与中间件
pub fn create_app(app_state: AppState) -> Router {
    let upload = &app_state.config.upload;
    let body_limit = app_state.config.body_limit();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        // 健康检查和系统信息
        .route("/health", get(health_check))
        .route("/health/db", get(db_health_check))
        .route("/health/storage", get(storage_health_check))
        .route("/api/system/info", get(system_info))
        // OpenAPI 文档
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/swagger-ui", get(swagger_ui_page))
        .route("/swagger-ui/", get(swagger_ui_page))
        .merge(create_api_routes())
        // 上传文件的静态访问
        .nest_service(&upload.public_path, ServeDir::new(&upload.dir))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::JwtManager,
        config::Config,
        models::{Role, User},
        services::SimulatedMyId,
        storage::LocalStorage,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret-0123456789";

    fn app(dir: &TempDir) -> Router {
        let mut config = Config::default();
        config.upload.dir = dir.path().to_string_lossy().to_string();
        config.auth.jwt_secret = SECRET.to_string();

        let state = AppState {
            database: None,
            storage: Arc::new(LocalStorage::from_config(&config.upload)),
            identity_provider: Arc::new(SimulatedMyId),
            jwt: Arc::new(JwtManager::from_config(&config.auth)),
            config,
        };
        create_app(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn token_for(id: i32) -> String {
        let now = chrono::Utc::now();
        let user = User {
            id,
            email: "staff@example.com".to_string(),
            name: "Staff".to_string(),
            phone: None,
            password_hash: String::new(),
            role: Role::Admin,
            is_verified: true,
            otp: None,
            otp_expires_at: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        JwtManager::new(SECRET, 3600).issue(&user).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir), get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_db_health_without_database() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir), get_request("/health/db")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["data"]["status"], "unavailable");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir), get_request("/applications")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);
        assert_eq!(body["msg"], "Missing Authorization header");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .uri("/auth/profile")
            .header(AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&dir), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_valid_token_without_database() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .uri("/branches")
            .header(AUTHORIZATION, format!("Bearer {}", token_for(1)))
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&dir), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], 503);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(&dir), get_request("/api-docs/openapi.json")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/applications/{id}"].is_object());
        assert!(body["paths"]["/auth/register"].is_object());
    }

    #[tokio::test]
    async fn test_serves_uploaded_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("image-1-1.png"), b"img").unwrap();

        let response = app(&dir)
            .oneshot(get_request("/public/uploads/image-1-1.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"img");
    }
}
