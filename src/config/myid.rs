use serde::{Deserialize, Serialize};

/// MyID 提供方工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MyIdMode {
    /// 本地模拟，返回固定的测试身份数据
    Simulated,
    /// 调用真实的 MyID HTTP 接口
    Http,
}

/// MyID 身份核验配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyIdConfig {
    /// 工作模式
    pub mode: MyIdMode,
    /// MyID API 基础URL
    pub base_url: String,
    /// 客户端ID
    pub client_id: String,
    /// 客户端密钥
    pub client_secret: String,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

impl Default for MyIdConfig {
    fn default() -> Self {
        Self {
            mode: MyIdMode::Simulated,
            base_url: "https://myid.uz".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_seconds: 15,
        }
    }
}

impl MyIdConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.mode == MyIdMode::Simulated {
            return Ok(());
        }

        if self.base_url.is_empty() {
            return Err("MyID base_url 不能为空".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("MyID base_url 必须以 http:// 或 https:// 开头".to_string());
        }

        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err("HTTP 模式下必须配置 client_id 和 client_secret".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("超时时间必须大于0".to_string());
        }

        Ok(())
    }

    /// 获取完整的API URL
    pub fn get_api_url(&self, endpoint: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        format!("{}/{}", base, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_mode_skips_credentials() {
        let config = MyIdConfig::default();
        assert_eq!(config.mode, MyIdMode::Simulated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_mode_requires_credentials() {
        let mut config = MyIdConfig {
            mode: MyIdMode::Http,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.client_id = "client".to_string();
        config.client_secret = "secret".to_string();
        assert!(config.validate().is_ok());

        config.base_url = "ftp://myid.uz".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_api_url() {
        let config = MyIdConfig {
            base_url: "https://myid.uz/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.get_api_url("/api/v1/verify"),
            "https://myid.uz/api/v1/verify"
        );
    }
}
