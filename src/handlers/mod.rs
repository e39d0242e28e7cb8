pub mod application;
pub mod auth;
pub mod branch;
pub mod health;
pub mod product;

pub use application::{
    create_application, delete_application, get_application, list_applications,
    update_application, upload_application_video,
};
pub use auth::{login, profile, register, send_otp, upload_avatar, verify_myid, verify_otp};
pub use branch::{create_branch, delete_branch, get_branch, list_branches, update_branch};
pub use health::{
    db_health_check, health_check, storage_health_check, swagger_ui_page, system_info,
};
pub use product::{create_product, delete_product, get_product, list_products, update_product};

use crate::{
    auth::JwtManager,
    config::Config,
    database::Database,
    error::{AppError, AppResult},
    services::IdentityProvider,
    storage::Storage,
};
use std::sync::Arc;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub database: Option<Database>,
    pub storage: Arc<dyn Storage>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub jwt: Arc<JwtManager>,
    pub config: Config,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.database)
            .field("identity_provider", &self.identity_provider.name())
            .field("jwt", &self.jwt)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// 数据库连接，未连接时返回服务不可用
    pub fn db(&self) -> AppResult<&Database> {
        self.database
            .as_ref()
            .ok_or_else(|| AppError::service_unavailable("Database is not available"))
    }
}
