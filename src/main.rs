/*
 * LoanDesk - Loan Application and Branch Management Backend
 * Copyright (c) 2024 LoanDesk Project
 *
 * This work is licensed under CC BY-NC-SA 4.0
 * https://creativecommons.org/licenses/by-nc-sa/4.0/
 */

use loandesk_backend::{
    auth::JwtManager,
    config::Config,
    database::Database,
    error::AppResult,
    handlers::AppState,
    routes::create_app,
    services::build_identity_provider,
    storage::LocalStorage,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 配置文件路径环境变量
const CONFIG_ENV: &str = "LOANDESK_CONFIG";

#[tokio::main]
async fn main() -> AppResult<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loandesk_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config = match Config::from_file(&config_path) {
        Ok(config) => {
            tracing::info!("已加载配置文件: {}", config_path);
            config
        }
        Err(e) => {
            tracing::warn!("读取配置文件 {} 失败，使用默认配置: {}", config_path, e);
            let default_config = Config::default();
            if !std::path::Path::new(&config_path).exists() {
                if let Err(e) = default_config.save_to_file(&config_path) {
                    tracing::warn!("保存默认配置失败: {}", e);
                }
            }
            default_config
        }
    };
    config.validate()?;
    if config.uses_default_jwt_secret() {
        tracing::warn!("正在使用默认JWT密钥，生产环境请在配置文件中修改 auth.jwt_secret");
    }

    tracing::info!("服务器配置: {}", config.server_addr());

    // 初始化数据库（连接失败时以无数据库模式启动，业务接口返回503）
    let database = match Database::new(&config.database).await {
        Ok(db) => {
            if let Err(e) = db.verify_connection().await {
                tracing::warn!("数据库验证失败: {}", e);
            }
            if config.database.run_migrations {
                db.migrate().await?;
            }
            Some(db)
        }
        Err(e) => {
            tracing::warn!("数据库连接失败，服务将在无数据库模式下启动: {}", e);
            None
        }
    };

    // 初始化上传目录
    let storage = LocalStorage::from_config(&config.upload);
    storage.ensure_dir().await?;
    tracing::info!("上传目录: {}", storage.root().display());

    let identity_provider = build_identity_provider(&config.myid)?;
    tracing::info!("MyID 身份服务: {}", identity_provider.name());

    let app_state = AppState {
        database: database.clone(),
        storage: Arc::new(storage),
        identity_provider,
        jwt: Arc::new(JwtManager::from_config(&config.auth)),
        config: config.clone(),
    };

    let app = create_app(app_state);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(&config.server_addr()).await?;
    tracing::info!("🚀 服务器启动成功，监听地址: {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// 等待 Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
        return;
    }
    tracing::info!("收到退出信号，正在停止服务...");
}
