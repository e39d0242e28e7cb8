use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{Role, User},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// 使用 Argon2id 计算密码哈希
pub fn hash_password(password: &str) -> AppResult<String> {
    use argon2::password_hash::rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("密码哈希失败: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// 校验密码；哈希格式错误视为内部错误
pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| anyhow::anyhow!("密码哈希解析失败: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 访问令牌载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))
    }
}

/// 签发与校验 HS256 访问令牌
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_hours * 60 * 60)
    }

    /// 为用户签发令牌
    pub fn issue(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.ttl_seconds,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("生成访问令牌失败: {}", e))?;

        Ok(token)
    }

    /// 校验令牌签名与有效期
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(
            |e| {
                tracing::debug!("令牌校验失败: {}", e);
                AppError::unauthorized("Invalid or expired token")
            },
        )?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32, role: Role) -> User {
        let now = Utc::now();
        User {
            id,
            email: "ali@example.com".to_string(),
            name: "Ali".to_string(),
            phone: None,
            password_hash: String::new(),
            role,
            is_verified: false,
            otp: None,
            otp_expires_at: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("secret123").unwrap();
        assert_ne!(hash, "secret123");
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("secret124", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_with_malformed_hash() {
        assert!(verify_password("secret123", "not-a-hash").is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = JwtManager::new("test-secret-key-0123456789", 3600);
        let token = jwt.issue(&user(42, Role::Admin)).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_with_wrong_secret() {
        let issuer = JwtManager::new("test-secret-key-0123456789", 3600);
        let other = JwtManager::new("another-secret-key-987654", 3600);
        let token = issuer.issue(&user(1, Role::User)).unwrap();

        assert!(matches!(
            other.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // 超出默认 60 秒容差
        let jwt = JwtManager::new("test-secret-key-0123456789", -120);
        let token = jwt.issue(&user(1, Role::User)).unwrap();
        assert!(jwt.verify(&token).is_err());
    }
}
