use super::AppState;
use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{
        CreateProductRequest, PagedResult, Pagination, Product, ProductFilter,
        UpdateProductRequest, check_amount_range,
    },
    repositories::ProductRepository,
    response::ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// 产品列表查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub is_active: Option<bool>,
    pub category: Option<String>,
}

fn not_found(id: i32) -> AppError {
    AppError::not_found(format!("Product with ID {} not found", id))
}

/// 创建产品
#[utoipa::path(
    post,
    path = "/products",
    tag = "产品",
    request_body = CreateProductRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "创建成功", body = ApiResponse<Product>),
        (status = 400, description = "参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> AppResult<ApiResponse<Product>> {
    auth.require_staff()?;
    request.validate().map_err(AppError::validation)?;

    let product = ProductRepository::new(app_state.db()?.clone())
        .create(request)
        .await?;

    tracing::info!("产品 {} ({}) 已创建", product.id, product.name);

    Ok(ApiResponse::success_with_message(
        product,
        "Product created successfully",
    ))
}

/// 产品列表
#[utoipa::path(
    get,
    path = "/products",
    tag = "产品",
    params(ProductListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<PagedResult<Product>>)
    )
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ProductListQuery>,
) -> AppResult<ApiResponse<PagedResult<Product>>> {
    let pagination = Pagination::from_query(query.page, query.page_size);
    let filter = ProductFilter {
        is_active: query.is_active,
        category: query.category.filter(|c| !c.trim().is_empty()),
    };

    let result = ProductRepository::new(app_state.db()?.clone())
        .list(&filter, &pagination)
        .await?;

    Ok(ApiResponse::success_with_message(
        result,
        "Products retrieved successfully",
    ))
}

/// 产品详情
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "产品",
    params(("id" = i32, Path, description = "产品ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<Product>),
        (status = 404, description = "产品不存在")
    )
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Product>> {
    let product = ProductRepository::new(app_state.db()?.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(ApiResponse::success_with_message(
        product,
        "Product retrieved successfully",
    ))
}

/// 更新产品
#[utoipa::path(
    patch,
    path = "/products/{id}",
    tag = "产品",
    params(("id" = i32, Path, description = "产品ID")),
    request_body = UpdateProductRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "更新成功", body = ApiResponse<Product>),
        (status = 400, description = "参数错误"),
        (status = 403, description = "无权限"),
        (status = 404, description = "产品不存在")
    )
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateProductRequest>,
) -> AppResult<ApiResponse<Product>> {
    auth.require_staff()?;
    request.validate().map_err(AppError::validation)?;

    let repo = ProductRepository::new(app_state.db()?.clone());
    let current = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

    let (min_amount, max_amount) = request.merged_range(&current);
    check_amount_range(min_amount, max_amount).map_err(AppError::validation)?;

    let product = repo.update(id, request).await?;

    Ok(ApiResponse::success_with_message(
        product,
        "Product updated successfully",
    ))
}

/// 删除产品
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "产品",
    params(("id" = i32, Path, description = "产品ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "删除成功"),
        (status = 403, description = "无权限"),
        (status = 404, description = "产品不存在")
    )
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    auth.require_staff()?;

    let repo = ProductRepository::new(app_state.db()?.clone());
    if !repo.delete(id).await? {
        return Err(not_found(id));
    }

    tracing::info!("产品 {} 已由用户 {} 删除", id, auth.0.id);
    Ok(ApiResponse::<()>::success_empty("Product deleted successfully"))
}
