use crate::{
    database::Database,
    error::AppResult,
    models::{
        Branch, BranchFilter, BranchListItem, BranchRow, CreateBranchRequest, ManagerChange,
        PagedResult, Pagination, UpdateBranchRequest,
    },
};
use sqlx::{Postgres, QueryBuilder};

const BRANCH_COLUMNS: &str = r#"
    id, name, address, phone, city, region, manager_id, image_url,
    is_active, created_at, updated_at
"#;

const BRANCH_ROW_SELECT: &str = r#"
    SELECT
        b.id, b.name, b.address, b.phone, b.city, b.region, b.manager_id, b.image_url,
        b.is_active, b.created_at, b.updated_at,
        m.name AS manager_name, m.email AS manager_email, m.phone AS manager_phone,
        (SELECT COUNT(*) FROM applications a WHERE a.branch_id = b.id) AS applications_count
    FROM branches b
    LEFT JOIN users m ON m.id = b.manager_id
"#;

/// 网点仓库
#[derive(Clone)]
pub struct BranchRepository {
    db: Database,
}

impl BranchRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 创建网点
    pub async fn create(
        &self,
        request: CreateBranchRequest,
        image_url: Option<String>,
    ) -> AppResult<Branch> {
        let sql = format!(
            r#"
            INSERT INTO branches (name, address, phone, city, region, manager_id, image_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BRANCH_COLUMNS}
            "#
        );

        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(request.name.trim())
            .bind(request.address.trim())
            .bind(request.phone.trim())
            .bind(request.city.trim())
            .bind(request.region)
            .bind(request.manager_id)
            .bind(image_url)
            .bind(request.is_active.unwrap_or(true))
            .fetch_one(self.db.pool())
            .await?;

        Ok(branch)
    }

    /// 根据ID查找网点
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Branch>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1");
        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(branch)
    }

    /// 网点是否存在
    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
                .bind(id)
                .fetch_one(self.db.pool())
                .await?;

        Ok(exists)
    }

    /// 查找网点及负责人信息
    pub async fn find_row(&self, id: i32) -> AppResult<Option<BranchRow>> {
        let sql = format!("{BRANCH_ROW_SELECT} WHERE b.id = $1");
        let row = sqlx::query_as::<_, BranchRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row)
    }

    /// 分页查询网点列表，按创建时间倒序
    pub async fn list(
        &self,
        filter: &BranchFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<BranchListItem>> {
        let mut query_builder = QueryBuilder::new(BRANCH_ROW_SELECT);
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM branches b");

        push_filter(&mut query_builder, filter);
        push_filter(&mut count_builder, filter);

        query_builder.push(" ORDER BY b.created_at DESC, b.id DESC");
        query_builder.push(" LIMIT ");
        query_builder.push_bind(pagination.limit());
        query_builder.push(" OFFSET ");
        query_builder.push_bind(pagination.offset());

        let rows = query_builder
            .build_query_as::<BranchRow>()
            .fetch_all(self.db.pool())
            .await?;

        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;

        let items = rows.into_iter().map(BranchRow::into_list_item).collect();
        Ok(PagedResult::new(items, total, pagination))
    }

    /// 更新网点；`image_url` 为 None 时保留原图片
    pub async fn update(
        &self,
        id: i32,
        request: UpdateBranchRequest,
        image_url: Option<String>,
    ) -> AppResult<Branch> {
        let sql = format!(
            r#"
            UPDATE branches SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                phone = COALESCE($4, phone),
                city = COALESCE($5, city),
                region = COALESCE($6, region),
                manager_id = CASE WHEN $7 THEN $8 ELSE manager_id END,
                image_url = COALESCE($9, image_url),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BRANCH_COLUMNS}
            "#
        );

        let change_manager = !matches!(request.manager, ManagerChange::Keep);

        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(id)
            .bind(request.name.map(|v| v.trim().to_string()))
            .bind(request.address.map(|v| v.trim().to_string()))
            .bind(request.phone.map(|v| v.trim().to_string()))
            .bind(request.city.map(|v| v.trim().to_string()))
            .bind(request.region)
            .bind(change_manager)
            .bind(request.manager.manager_id())
            .bind(image_url)
            .bind(request.is_active)
            .fetch_one(self.db.pool())
            .await?;

        Ok(branch)
    }

    /// 删除网点
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// 追加过滤条件
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BranchFilter) {
    let mut separated = " WHERE ";

    if let Some(region) = filter.region {
        builder.push(separated).push("b.region = ").push_bind(region);
        separated = " AND ";
    }

    if let Some(is_active) = filter.is_active {
        builder.push(separated).push("b.is_active = ").push_bind(is_active);
    }
}
