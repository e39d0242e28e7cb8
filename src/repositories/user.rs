use crate::{
    database::Database,
    error::AppResult,
    models::{NewUser, User},
};
use chrono::{DateTime, Utc};

const USER_COLUMNS: &str = r#"
    id, email, name, phone, password_hash, role, is_verified,
    otp, otp_expires_at, image_url, created_at, updated_at
"#;

/// 用户仓库
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 创建用户
    pub async fn create(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (email, name, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.email)
            .bind(user.name)
            .bind(user.phone)
            .bind(user.password_hash)
            .bind(user.role)
            .fetch_one(self.db.pool())
            .await?;

        Ok(user)
    }

    /// 根据ID查找用户
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(user)
    }

    /// 根据邮箱查找用户
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(user)
    }

    /// 根据手机号查找用户
    pub async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(phone)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(user)
    }

    /// 保存验证码及过期时间，覆盖之前的验证码
    pub async fn set_otp(&self, id: i32, otp: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp = $2, otp_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// 清除验证码
    pub async fn clear_otp(&self, id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp = NULL, otp_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// 消费验证码：匹配且未过期时标记为已验证并清除验证码。
    ///
    /// 条件写在同一条 UPDATE 中，同一验证码并发提交时只有一次能返回用户。
    pub async fn consume_otp(
        &self,
        id: i32,
        otp: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET is_verified = TRUE, otp = NULL, otp_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
              AND is_verified = FALSE
              AND otp = $2
              AND otp_expires_at >= $3
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(otp)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(user)
    }

    /// 更新头像URL
    pub async fn update_avatar(&self, id: i32, image_url: &str) -> AppResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET image_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(image_url)
            .fetch_one(self.db.pool())
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;
    use sqlx::PgPool;

    fn repo(pool: PgPool) -> UserRepository {
        UserRepository::new(Database::from_pool(pool))
    }

    fn new_user(email: &str, phone: Option<&str>) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Ali Valiyev".to_string(),
            phone: phone.map(str::to_string),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "需要 DATABASE_URL 指向 Postgres"]
    async fn test_consume_otp_succeeds_once(pool: PgPool) {
        let repo = repo(pool);
        let user = repo
            .create(new_user("otp@example.com", Some("+998901112233")))
            .await
            .unwrap();

        let now = Utc::now();
        repo.set_otp(user.id, "123456", now + Duration::seconds(120))
            .await
            .unwrap();

        assert!(repo.consume_otp(user.id, "000000", now).await.unwrap().is_none());

        let verified = repo.consume_otp(user.id, "123456", now).await.unwrap().unwrap();
        assert!(verified.is_verified);
        assert!(verified.otp.is_none());
        assert!(verified.otp_expires_at.is_none());

        assert!(repo.consume_otp(user.id, "123456", now).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "需要 DATABASE_URL 指向 Postgres"]
    async fn test_consume_otp_rejects_expired_code(pool: PgPool) {
        let repo = repo(pool);
        let user = repo
            .create(new_user("late@example.com", Some("+998904445566")))
            .await
            .unwrap();

        let issued = Utc::now();
        let expiry = issued + Duration::seconds(120);
        repo.set_otp(user.id, "654321", expiry).await.unwrap();

        let after = expiry + Duration::seconds(1);
        assert!(repo.consume_otp(user.id, "654321", after).await.unwrap().is_none());

        let unchanged = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!unchanged.is_verified);
        assert_eq!(unchanged.otp.as_deref(), Some("654321"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "需要 DATABASE_URL 指向 Postgres"]
    async fn test_duplicate_email_and_phone_are_unique_violations(pool: PgPool) {
        let repo = repo(pool);
        repo.create(new_user("dup@example.com", Some("+998907778899")))
            .await
            .unwrap();

        let err = repo
            .create(new_user("dup@example.com", None))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        let err = repo
            .create(new_user("other@example.com", Some("+998907778899")))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        assert!(repo.find_by_email("other@example.com").await.unwrap().is_none());
    }
}
