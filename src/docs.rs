use crate::{
    handlers::{
        application::{CreateApplicationForm, VideoUploadForm},
        auth::AvatarUploadForm,
        branch::BranchForm,
    },
    models::{
        Application, ApplicationBranch, ApplicationDetail, ApplicationStatus, ApplicationUser,
        AuthResponse, Branch, BranchDetail, BranchListItem, BranchManager, CreateProductRequest,
        LoginRequest, MyIdSummary, PagedResult, Product, RegisterRequest, Region, Role,
        SendOtpRequest, SendOtpResponse, UpdateApplicationRequest, UpdateProductRequest,
        UserProfile, VerifyMyIdRequest, VerifyOtpRequest,
    },
    response::ApiResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// 注册 JWT Bearer 认证方式
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // 系统
        crate::handlers::health::health_check,
        crate::handlers::health::db_health_check,
        crate::handlers::health::storage_health_check,
        crate::handlers::health::system_info,
        // 认证
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::send_otp,
        crate::handlers::auth::verify_otp,
        crate::handlers::auth::verify_myid,
        crate::handlers::auth::profile,
        crate::handlers::auth::upload_avatar,
        // 申请
        crate::handlers::application::create_application,
        crate::handlers::application::list_applications,
        crate::handlers::application::get_application,
        crate::handlers::application::update_application,
        crate::handlers::application::delete_application,
        crate::handlers::application::upload_application_video,
        // 网点
        crate::handlers::branch::create_branch,
        crate::handlers::branch::list_branches,
        crate::handlers::branch::get_branch,
        crate::handlers::branch::update_branch,
        crate::handlers::branch::delete_branch,
        // 产品
        crate::handlers::product::create_product,
        crate::handlers::product::list_products,
        crate::handlers::product::get_product,
        crate::handlers::product::update_product,
        crate::handlers::product::delete_product,
    ),
    components(
        schemas(
            // 用户与认证
            Role,
            UserProfile,
            RegisterRequest,
            LoginRequest,
            SendOtpRequest,
            SendOtpResponse,
            VerifyOtpRequest,
            VerifyMyIdRequest,
            AuthResponse,
            MyIdSummary,
            AvatarUploadForm,
            // 申请
            ApplicationStatus,
            Application,
            ApplicationUser,
            ApplicationBranch,
            ApplicationDetail,
            UpdateApplicationRequest,
            CreateApplicationForm,
            VideoUploadForm,
            // 网点
            Region,
            Branch,
            BranchManager,
            BranchListItem,
            BranchDetail,
            BranchForm,
            // 产品
            Product,
            CreateProductRequest,
            UpdateProductRequest,
            // 通用响应模型
            ApiResponse<UserProfile>,
            ApiResponse<AuthResponse>,
            ApiResponse<SendOtpResponse>,
            ApiResponse<MyIdSummary>,
            ApiResponse<Application>,
            ApiResponse<ApplicationDetail>,
            ApiResponse<PagedResult<ApplicationDetail>>,
            ApiResponse<Branch>,
            ApiResponse<BranchDetail>,
            ApiResponse<PagedResult<BranchListItem>>,
            ApiResponse<Product>,
            ApiResponse<PagedResult<Product>>,
            PagedResult<ApplicationDetail>,
            PagedResult<BranchListItem>,
            PagedResult<Product>,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "认证", description = "注册、登录、短信验证码、MyID 实名认证与头像"),
        (name = "申请", description = "贷款申请的提交、查询、修改与视频上传"),
        (name = "网点", description = "网点的维护与负责人管理"),
        (name = "产品", description = "贷款产品目录"),
        (name = "系统", description = "健康检查与系统信息")
    ),
    info(
        title = "LoanDesk API",
        version = "1.0.0",
        description = "LoanDesk 贷款申请与网点管理 REST API 文档"
    ),
    servers(
        (url = "http://localhost:8080", description = "开发环境")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
