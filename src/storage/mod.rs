pub mod local;

pub use local::LocalStorage;

use crate::error::AppResult;

/// 上传文件存储接口，文件以对外访问URL标识
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 保存文件，返回对外访问URL
    async fn save(&self, filename: &str, data: &[u8]) -> AppResult<String>;

    /// 根据访问URL删除文件；文件不存在时视为成功
    async fn delete(&self, url: &str) -> AppResult<()>;

    /// 存储是否可写
    async fn health_check(&self) -> AppResult<bool>;
}

/// 删除被替换或随记录删除的旧文件，失败只记录日志
pub async fn remove_quietly(storage: &dyn Storage, url: Option<&str>) {
    let Some(url) = url else {
        return;
    };

    if let Err(e) = storage.delete(url).await {
        tracing::warn!("删除旧文件失败 {}: {}", url, e);
    }
}
