use crate::{
    database::Database,
    error::AppResult,
    models::{MyId, MyIdProfile},
};

/// MyID 核验记录仓库
#[derive(Clone)]
pub struct MyIdRepository {
    db: Database,
}

impl MyIdRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 写入核验结果：用户已有记录时覆盖，否则新建
    pub async fn upsert_verified(&self, user_id: i32, profile: MyIdProfile) -> AppResult<MyId> {
        let record = sqlx::query_as::<_, MyId>(
            r#"
            INSERT INTO my_ids (
                user_id, response_id, comparison_value, passport_series, passport_number,
                full_name, birth_date, address, nationality, profile, is_verified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            ON CONFLICT (user_id) DO UPDATE SET
                response_id = EXCLUDED.response_id,
                comparison_value = EXCLUDED.comparison_value,
                passport_series = EXCLUDED.passport_series,
                passport_number = EXCLUDED.passport_number,
                full_name = EXCLUDED.full_name,
                birth_date = EXCLUDED.birth_date,
                address = EXCLUDED.address,
                nationality = EXCLUDED.nationality,
                profile = EXCLUDED.profile,
                is_verified = TRUE,
                updated_at = NOW()
            RETURNING
                id, user_id, response_id, comparison_value, passport_series, passport_number,
                full_name, birth_date, address, nationality, profile, is_verified,
                created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(profile.response_id)
        .bind(profile.comparison_value)
        .bind(profile.passport_series)
        .bind(profile.passport_number)
        .bind(profile.full_name)
        .bind(profile.birth_date)
        .bind(profile.address)
        .bind(profile.nationality)
        .bind(profile.profile)
        .fetch_one(self.db.pool())
        .await?;

        Ok(record)
    }
}
