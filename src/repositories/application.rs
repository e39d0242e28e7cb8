use crate::{
    database::Database,
    error::AppResult,
    models::{
        Application, ApplicationDetail, ApplicationFilter, ApplicationRow,
        CreateApplicationRequest, PagedResult, Pagination, UpdateApplicationRequest,
    },
};
use sqlx::{Postgres, QueryBuilder};

const APPLICATION_COLUMNS: &str = r#"
    id, title, description, amount, notes, status, video_url,
    user_id, branch_id, created_at, updated_at
"#;

const APPLICATION_ROW_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.description, a.amount, a.notes, a.status, a.video_url,
        a.user_id, a.branch_id, a.created_at, a.updated_at,
        u.name AS user_name, u.email AS user_email, u.phone AS user_phone,
        b.name AS branch_name, b.city AS branch_city,
        b.address AS branch_address, b.phone AS branch_phone
    FROM applications a
    JOIN users u ON u.id = a.user_id
    LEFT JOIN branches b ON b.id = a.branch_id
"#;

/// 申请仓库
#[derive(Clone)]
pub struct ApplicationRepository {
    db: Database,
}

impl ApplicationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 创建申请，状态默认为 PENDING
    pub async fn create(
        &self,
        user_id: i32,
        request: CreateApplicationRequest,
        video_url: Option<String>,
    ) -> AppResult<Application> {
        let sql = format!(
            r#"
            INSERT INTO applications (title, description, amount, notes, video_url, user_id, branch_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(request.title.trim())
            .bind(request.description.trim())
            .bind(request.amount)
            .bind(request.notes)
            .bind(video_url)
            .bind(user_id)
            .bind(request.branch_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(application)
    }

    /// 根据ID查找申请
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Application>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(application)
    }

    /// 查找申请并带出申请人与网点（含网点地址、电话）
    pub async fn find_detail(&self, id: i32) -> AppResult<Option<ApplicationDetail>> {
        let sql = format!("{APPLICATION_ROW_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| r.into_detail(true)))
    }

    /// 分页查询申请列表，按创建时间倒序
    pub async fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApplicationDetail>> {
        let mut query_builder = QueryBuilder::new(APPLICATION_ROW_SELECT);
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM applications a");

        push_filter(&mut query_builder, filter);
        push_filter(&mut count_builder, filter);

        query_builder.push(" ORDER BY a.created_at DESC, a.id DESC");
        query_builder.push(" LIMIT ");
        query_builder.push_bind(pagination.limit());
        query_builder.push(" OFFSET ");
        query_builder.push_bind(pagination.offset());

        let rows = query_builder
            .build_query_as::<ApplicationRow>()
            .fetch_all(self.db.pool())
            .await?;

        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;

        let items = rows.into_iter().map(|r| r.into_detail(false)).collect();
        Ok(PagedResult::new(items, total, pagination))
    }

    /// 更新申请，未提供的字段保持不变
    pub async fn update(&self, id: i32, request: UpdateApplicationRequest) -> AppResult<Application> {
        let sql = format!(
            r#"
            UPDATE applications SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                amount = COALESCE($5, amount),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(request.title.map(|t| t.trim().to_string()))
            .bind(request.description.map(|d| d.trim().to_string()))
            .bind(request.status)
            .bind(request.amount)
            .bind(request.notes)
            .fetch_one(self.db.pool())
            .await?;

        Ok(application)
    }

    /// 设置视频URL
    pub async fn set_video(&self, id: i32, video_url: &str) -> AppResult<Application> {
        let sql = format!(
            r#"
            UPDATE applications
            SET video_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(video_url)
            .fetch_one(self.db.pool())
            .await?;

        Ok(application)
    }

    /// 删除申请
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 网点最近的申请
    pub async fn recent_for_branch(&self, branch_id: i32, limit: i64) -> AppResult<Vec<Application>> {
        let sql = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE branch_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        );

        let applications = sqlx::query_as::<_, Application>(&sql)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;

        Ok(applications)
    }
}

/// 追加过滤条件
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ApplicationFilter) {
    let mut separated = " WHERE ";

    if let Some(user_id) = filter.user_id {
        builder.push(separated).push("a.user_id = ").push_bind(user_id);
        separated = " AND ";
    }

    if let Some(status) = filter.status {
        builder.push(separated).push("a.status = ").push_bind(status);
        separated = " AND ";
    }

    if let Some(branch_id) = filter.branch_id {
        builder.push(separated).push("a.branch_id = ").push_bind(branch_id);
    }
}
