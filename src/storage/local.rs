use super::Storage;
use crate::{
    config::UploadConfig,
    error::{AppError, AppResult},
};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// 本地磁盘存储，文件写入上传目录并通过静态路径对外访问
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_path: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_path: &str) -> Self {
        Self {
            root: root.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.dir, &config.public_path)
    }

    /// 上传目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 创建上传目录
    pub async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("上传目录已就绪: {}", self.root.display());
        Ok(())
    }

    /// 文件名对应的访问URL
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.public_path, filename)
    }

    /// 将访问URL解析为磁盘路径，只接受上传目录下的单层文件名
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let name = url
            .strip_prefix(self.public_path.as_str())?
            .strip_prefix('/')?;

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }

    fn check_filename(filename: &str) -> AppResult<()> {
        let valid = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && filename != "."
            && filename != "..";

        if valid {
            Ok(())
        } else {
            Err(AppError::storage(format!("非法文件名: {}", filename)))
        }
    }
}

#[async_trait::async_trait]
impl Storage for LocalStorage {
    async fn save(&self, filename: &str, data: &[u8]) -> AppResult<String> {
        Self::check_filename(filename)?;

        let path = self.root.join(filename);
        fs::write(&path, data).await?;

        tracing::debug!("文件已保存: {} ({} 字节)", path.display(), data.len());
        Ok(self.url_for(filename))
    }

    async fn delete(&self, url: &str) -> AppResult<()> {
        let Some(path) = self.resolve(url) else {
            tracing::warn!("忽略不属于上传目录的文件URL: {}", url);
            return Ok(());
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("文件已删除: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        let metadata = fs::metadata(&self.root).await?;
        Ok(metadata.is_dir() && !metadata.permissions().readonly())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "/public/uploads/")
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let url = storage.save("image-1-2.png", b"png").await.unwrap();
        assert_eq!(url, "/public/uploads/image-1-2.png");
        assert_eq!(
            std::fs::read(dir.path().join("image-1-2.png")).unwrap(),
            b"png"
        );

        storage.delete(&url).await.unwrap();
        assert!(!dir.path().join("image-1-2.png").exists());

        // 重复删除不报错
        storage.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        assert!(storage.save("../escape.png", b"x").await.is_err());
        assert!(storage.resolve("/public/uploads/../secret").is_none());
        assert!(storage.resolve("/public/uploads/a/b.png").is_none());
        assert!(storage.resolve("/elsewhere/a.png").is_none());
        assert!(storage.resolve("/public/uploads/a.png").is_some());
    }

    #[tokio::test]
    async fn test_ensure_dir_and_health() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested/uploads"), "/public/uploads");

        storage.ensure_dir().await.unwrap();
        assert!(storage.health_check().await.unwrap());
    }
}
