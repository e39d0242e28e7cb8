use crate::{
    database::Database,
    error::AppResult,
    models::{
        CreateProductRequest, PagedResult, Pagination, Product, ProductFilter, UpdateProductRequest,
    },
};
use sqlx::{Postgres, QueryBuilder};

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, category, interest_rate, min_amount, max_amount,
    term_months, is_active, created_at, updated_at
"#;

/// 产品仓库
#[derive(Clone)]
pub struct ProductRepository {
    db: Database,
}

impl ProductRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 创建产品
    pub async fn create(&self, request: CreateProductRequest) -> AppResult<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (
                name, description, category, interest_rate,
                min_amount, max_amount, term_months, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(request.name.trim())
            .bind(request.description)
            .bind(request.category)
            .bind(request.interest_rate)
            .bind(request.min_amount)
            .bind(request.max_amount)
            .bind(request.term_months)
            .bind(request.is_active.unwrap_or(true))
            .fetch_one(self.db.pool())
            .await?;

        Ok(product)
    }

    /// 根据ID查找产品
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(product)
    }

    /// 分页查询产品列表
    pub async fn list(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Product>> {
        let mut query_builder =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM products");

        push_filter(&mut query_builder, filter);
        push_filter(&mut count_builder, filter);

        query_builder.push(" ORDER BY created_at DESC, id DESC");
        query_builder.push(" LIMIT ");
        query_builder.push_bind(pagination.limit());
        query_builder.push(" OFFSET ");
        query_builder.push_bind(pagination.offset());

        let products = query_builder
            .build_query_as::<Product>()
            .fetch_all(self.db.pool())
            .await?;

        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;

        Ok(PagedResult::new(products, total, pagination))
    }

    /// 更新产品
    pub async fn update(&self, id: i32, request: UpdateProductRequest) -> AppResult<Product> {
        let sql = format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                interest_rate = COALESCE($5, interest_rate),
                min_amount = COALESCE($6, min_amount),
                max_amount = COALESCE($7, max_amount),
                term_months = COALESCE($8, term_months),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(request.name.map(|v| v.trim().to_string()))
            .bind(request.description)
            .bind(request.category)
            .bind(request.interest_rate)
            .bind(request.min_amount)
            .bind(request.max_amount)
            .bind(request.term_months)
            .bind(request.is_active)
            .fetch_one(self.db.pool())
            .await?;

        Ok(product)
    }

    /// 删除产品
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    let mut separated = " WHERE ";

    if let Some(is_active) = filter.is_active {
        builder.push(separated).push("is_active = ").push_bind(is_active);
        separated = " AND ";
    }

    if let Some(category) = &filter.category {
        builder
            .push(separated)
            .push("category = ")
            .push_bind(category.clone());
    }
}
