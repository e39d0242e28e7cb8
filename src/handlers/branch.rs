use super::AppState;
use crate::{
    error::{AppError, AppResult},
    file_processing::{
        MultipartForm, UploadKind, UploadPolicy, UploadedFile, generate_filename, validate_upload,
    },
    middleware::AuthUser,
    models::{
        Branch, BranchDetail, BranchFilter, BranchListItem, CreateBranchRequest, ManagerChange,
        PagedResult, Pagination, Region, UpdateBranchRequest,
    },
    repositories::{ApplicationRepository, BranchRepository, UserRepository},
    response::ApiResponse,
    storage::{Storage, remove_quietly},
};
use axum::extract::{Multipart, Path, Query, State};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// 详情中返回的最近申请数量
const RECENT_APPLICATIONS: i64 = 10;

/// 网点列表查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// 按地区筛选，不区分大小写
    #[param(value_type = Option<Region>)]
    pub region: Option<String>,
    /// 按启用状态筛选
    pub is_active: Option<bool>,
}

/// 网点表单（创建时前五项必填，更新时均可选）
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct BranchForm {
    name: String,
    address: String,
    phone: String,
    city: String,
    region: Region,
    /// 更新时传空值或0表示解除负责人
    manager_id: Option<String>,
    is_active: Option<bool>,
    /// 网点图片（jpg、jpeg、png、gif、webp，最大5MB）
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
}

fn not_found(id: i32) -> AppError {
    AppError::not_found(format!("Branch with ID {} not found", id))
}

/// 查询参数与表单共用的地区解析，空值视为未提供
fn parse_region(raw: Option<&str>) -> AppResult<Option<Region>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(AppError::validation),
    }
}

/// 负责人必须是已存在的用户
async fn ensure_manager_exists(users: &UserRepository, manager_id: Option<i32>) -> AppResult<()> {
    if let Some(manager_id) = manager_id {
        if users.find_by_id(manager_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Manager with ID {} not found",
                manager_id
            )));
        }
    }
    Ok(())
}

async fn store_image(
    storage: &dyn Storage,
    policy: &UploadPolicy,
    file: Option<&UploadedFile>,
) -> AppResult<Option<String>> {
    let Some(file) = file else {
        return Ok(None);
    };

    validate_upload(policy, file)?;
    let filename = generate_filename(UploadKind::Image, &file.original_name);
    Ok(Some(storage.save(&filename, &file.data).await?))
}

/// 创建网点
#[utoipa::path(
    post,
    path = "/branches",
    tag = "网点",
    request_body(content = BranchForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "创建成功", body = ApiResponse<Branch>),
        (status = 400, description = "参数错误或文件类型不允许"),
        (status = 403, description = "无权限"),
        (status = 404, description = "负责人不存在")
    )
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<Branch>> {
    auth.require_staff()?;

    let policy = UploadPolicy::image(&app_state.config.upload);
    let form = MultipartForm::collect(multipart, &policy).await?;

    let request = CreateBranchRequest {
        name: form.required("name")?,
        address: form.required("address")?,
        phone: form.required("phone")?,
        city: form.required("city")?,
        region: parse_region(form.text("region"))?
            .ok_or_else(|| AppError::validation("region is required"))?,
        manager_id: form.parse("manager_id")?,
        is_active: form.parse("is_active")?,
    };
    request.validate().map_err(AppError::validation)?;

    let db = app_state.db()?;
    ensure_manager_exists(&UserRepository::new(db.clone()), request.manager_id).await?;

    let image_url = store_image(app_state.storage.as_ref(), &policy, form.file.as_ref()).await?;

    let branch = match BranchRepository::new(db.clone())
        .create(request, image_url.clone())
        .await
    {
        Ok(branch) => branch,
        Err(e) => {
            remove_quietly(app_state.storage.as_ref(), image_url.as_deref()).await;
            return Err(e);
        }
    };

    tracing::info!("网点 {} ({}) 已由用户 {} 创建", branch.id, branch.name, auth.0.id);

    Ok(ApiResponse::success_with_message(
        branch,
        "Branch created successfully",
    ))
}

/// 网点列表
#[utoipa::path(
    get,
    path = "/branches",
    tag = "网点",
    params(BranchListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<PagedResult<BranchListItem>>)
    )
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<BranchListQuery>,
) -> AppResult<ApiResponse<PagedResult<BranchListItem>>> {
    let pagination = Pagination::from_query(query.page, query.page_size);
    let filter = BranchFilter {
        region: parse_region(query.region.as_deref())?,
        is_active: query.is_active,
    };

    let result = BranchRepository::new(app_state.db()?.clone())
        .list(&filter, &pagination)
        .await?;

    Ok(ApiResponse::success_with_message(
        result,
        "Branches retrieved successfully",
    ))
}

/// 网点详情
#[utoipa::path(
    get,
    path = "/branches/{id}",
    tag = "网点",
    params(("id" = i32, Path, description = "网点ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<BranchDetail>),
        (status = 404, description = "网点不存在")
    )
)]
pub async fn get_branch(
    State(app_state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<BranchDetail>> {
    let db = app_state.db()?;

    let row = BranchRepository::new(db.clone())
        .find_row(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let applications = ApplicationRepository::new(db.clone())
        .recent_for_branch(id, RECENT_APPLICATIONS)
        .await?;

    Ok(ApiResponse::success_with_message(
        row.into_detail(applications),
        "Branch retrieved successfully",
    ))
}

/// 更新网点
#[utoipa::path(
    patch,
    path = "/branches/{id}",
    tag = "网点",
    params(("id" = i32, Path, description = "网点ID")),
    request_body(content = BranchForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "更新成功", body = ApiResponse<Branch>),
        (status = 403, description = "无权限"),
        (status = 404, description = "网点或负责人不存在")
    )
)]
pub async fn update_branch(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<ApiResponse<Branch>> {
    auth.require_staff()?;

    let policy = UploadPolicy::image(&app_state.config.upload);
    let form = MultipartForm::collect(multipart, &policy).await?;

    let manager = match form.text("manager_id") {
        Some(raw) => ManagerChange::parse(raw).map_err(AppError::validation)?,
        None => ManagerChange::Keep,
    };

    let request = UpdateBranchRequest {
        name: form.text("name").map(str::to_string),
        address: form.text("address").map(str::to_string),
        phone: form.text("phone").map(str::to_string),
        city: form.text("city").map(str::to_string),
        region: parse_region(form.text("region"))?,
        manager,
        is_active: form.parse("is_active")?,
    };
    request.validate().map_err(AppError::validation)?;

    let db = app_state.db()?;
    let repo = BranchRepository::new(db.clone());
    let existing = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

    ensure_manager_exists(&UserRepository::new(db.clone()), request.manager.manager_id()).await?;

    let image_url = store_image(app_state.storage.as_ref(), &policy, form.file.as_ref()).await?;

    let branch = match repo.update(id, request, image_url.clone()).await {
        Ok(branch) => branch,
        Err(e) => {
            remove_quietly(app_state.storage.as_ref(), image_url.as_deref()).await;
            return Err(e);
        }
    };

    if image_url.is_some() {
        remove_quietly(app_state.storage.as_ref(), existing.image_url.as_deref()).await;
    }

    Ok(ApiResponse::success_with_message(
        branch,
        "Branch updated successfully",
    ))
}

/// 删除网点
#[utoipa::path(
    delete,
    path = "/branches/{id}",
    tag = "网点",
    params(("id" = i32, Path, description = "网点ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "删除成功"),
        (status = 403, description = "无权限"),
        (status = 404, description = "网点不存在")
    )
)]
pub async fn delete_branch(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    auth.require_staff()?;

    let repo = BranchRepository::new(app_state.db()?.clone());
    let branch = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }

    remove_quietly(app_state.storage.as_ref(), branch.image_url.as_deref()).await;
    tracing::info!("网点 {} 已由用户 {} 删除", id, auth.0.id);

    Ok(ApiResponse::<()>::success_empty("Branch deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region_ignores_case() {
        assert_eq!(parse_region(Some("toshkent")).unwrap(), Some(Region::Toshkent));
        assert_eq!(
            parse_region(Some(" Toshkent_Shahar ")).unwrap(),
            Some(Region::ToshkentShahar)
        );
        assert_eq!(parse_region(Some("BUXORO")).unwrap(), Some(Region::Buxoro));
    }

    #[test]
    fn test_parse_region_empty_and_invalid() {
        assert_eq!(parse_region(None).unwrap(), None);
        assert_eq!(parse_region(Some("  ")).unwrap(), None);
        assert!(matches!(
            parse_region(Some("london")),
            Err(AppError::Validation(msg)) if msg.starts_with("region must be one of")
        ));
    }

    #[test]
    fn test_list_query_accepts_lowercase_region() {
        let uri: axum::http::Uri = "/branches?region=samarqand&is_active=true".parse().unwrap();
        let axum::extract::Query(query) =
            axum::extract::Query::<BranchListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(
            parse_region(query.region.as_deref()).unwrap(),
            Some(Region::Samarqand)
        );
        assert_eq!(query.is_active, Some(true));
    }
}
