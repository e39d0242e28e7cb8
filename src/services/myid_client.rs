use crate::{
    config::{MyIdConfig, MyIdMode},
    error::{AppError, AppResult},
    models::MyIdProfile,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

const VERIFY_FAILED: &str = "MyID verification failed";

/// 身份核验提供方
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 用授权码换取身份资料
    async fn verify(&self, code: &str) -> AppResult<MyIdProfile>;

    /// 提供方名称，用于日志
    fn name(&self) -> &'static str;
}

/// 根据配置创建身份核验提供方
pub fn build_identity_provider(config: &MyIdConfig) -> AppResult<Arc<dyn IdentityProvider>> {
    match config.mode {
        MyIdMode::Simulated => {
            info!("MyID 使用模拟模式");
            Ok(Arc::new(SimulatedMyId))
        }
        MyIdMode::Http => {
            info!("MyID 使用HTTP模式: {}", config.base_url);
            Ok(Arc::new(HttpMyIdClient::new(config.clone())?))
        }
    }
}

/// 模拟提供方，返回固定的测试身份
#[derive(Debug, Clone, Default)]
pub struct SimulatedMyId;

#[async_trait]
impl IdentityProvider for SimulatedMyId {
    async fn verify(&self, code: &str) -> AppResult<MyIdProfile> {
        debug!("模拟 MyID 核验, code长度: {}", code.len());

        Ok(MyIdProfile {
            response_id: format!("MYID-{}", chrono::Utc::now().timestamp_millis()),
            comparison_value: Some(98.5),
            passport_series: Some("AA".to_string()),
            passport_number: Some("1234567".to_string()),
            full_name: Some("Xurshid Ismoilov".to_string()),
            birth_date: Some("1990-01-15".to_string()),
            address: Some("Toshkent shahar, Chilonzor tumani".to_string()),
            nationality: Some("O'zbekiston".to_string()),
            profile: Some(serde_json::json!({
                "photo": "base64_encoded_photo_here",
                "issueDate": "2020-01-15",
                "expiryDate": "2030-01-15",
                "issuedBy": "IIB Toshkent",
            })),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// 提交给 MyID 的核验请求
#[derive(Debug, Serialize)]
struct VerifyPayload<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// MyID 接口响应
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    profile: Option<MyIdProfile>,
}

/// MyID HTTP 客户端
#[derive(Debug, Clone)]
pub struct HttpMyIdClient {
    client: Client,
    config: MyIdConfig,
}

impl HttpMyIdClient {
    pub fn new(config: MyIdConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::config(format!("创建MyID HTTP客户端失败: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl IdentityProvider for HttpMyIdClient {
    async fn verify(&self, code: &str) -> AppResult<MyIdProfile> {
        let url = self.config.get_api_url("/api/v1/verify");
        let payload = VerifyPayload {
            code,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("MyID 请求失败: {}", e);
                AppError::bad_request(VERIFY_FAILED)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("MyID 返回错误状态 {}: {}", status, body);
            return Err(AppError::bad_request(VERIFY_FAILED));
        }

        let body: VerifyResponse = response.json().await.map_err(|e| {
            warn!("MyID 响应解析失败: {}", e);
            AppError::bad_request(VERIFY_FAILED)
        })?;

        if let Some(error) = body.error {
            warn!("MyID 核验未通过: {}", error);
            return Err(AppError::bad_request(VERIFY_FAILED));
        }

        body.profile.ok_or_else(|| AppError::bad_request(VERIFY_FAILED))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_provider_profile() {
        let provider = SimulatedMyId;
        let profile = provider.verify("any-code").await.unwrap();

        assert!(profile.response_id.starts_with("MYID-"));
        assert_eq!(profile.comparison_value, Some(98.5));
        assert_eq!(profile.passport_series.as_deref(), Some("AA"));
        assert_eq!(profile.full_name.as_deref(), Some("Xurshid Ismoilov"));
        assert_eq!(
            profile.profile.as_ref().and_then(|p| p.get("issuedBy")),
            Some(&serde_json::json!("IIB Toshkent"))
        );
    }

    #[test]
    fn test_build_provider_from_config() {
        let provider = build_identity_provider(&MyIdConfig::default()).unwrap();
        assert_eq!(provider.name(), "simulated");

        let http = MyIdConfig {
            mode: MyIdMode::Http,
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            ..Default::default()
        };
        assert_eq!(build_identity_provider(&http).unwrap().name(), "http");
    }

    #[tokio::test]
    async fn test_http_provider_unreachable_maps_to_bad_request() {
        let client = HttpMyIdClient::new(MyIdConfig {
            mode: MyIdMode::Http,
            base_url: "http://127.0.0.1:9".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            timeout_seconds: 2,
        })
        .unwrap();

        match client.verify("code").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, VERIFY_FAILED),
            other => panic!("unexpected result: {:?}", other.map(|p| p.response_id)),
        }
    }

    #[test]
    fn test_verify_response_with_error_field() {
        let body: VerifyResponse =
            serde_json::from_value(serde_json::json!({"error": "invalid_code"})).unwrap();
        assert_eq!(body.error.as_deref(), Some("invalid_code"));
    }
}
