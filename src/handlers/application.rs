use super::AppState;
use crate::{
    error::{AppError, AppResult},
    file_processing::{
        MultipartForm, UploadKind, UploadPolicy, UploadedFile, generate_filename, validate_upload,
    },
    middleware::AuthUser,
    models::{
        Application, ApplicationDetail, ApplicationFilter, ApplicationStatus,
        CreateApplicationRequest, PagedResult, Pagination, UpdateApplicationRequest,
    },
    repositories::{ApplicationRepository, BranchRepository},
    response::ApiResponse,
    storage::{Storage, remove_quietly},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// 申请列表查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApplicationListQuery {
    /// 页码，从1开始
    pub page: Option<u32>,
    /// 每页数量，最大100
    pub page_size: Option<u32>,
    /// 按状态筛选
    pub status: Option<ApplicationStatus>,
    /// 按网点筛选
    pub branch_id: Option<i32>,
}

/// 创建申请表单
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateApplicationForm {
    title: String,
    description: String,
    branch_id: Option<i32>,
    amount: Option<f64>,
    notes: Option<String>,
    /// 视频文件（mp4、mov、avi、mkv、webm，最大50MB）
    #[schema(value_type = Option<String>, format = Binary)]
    video: Option<Vec<u8>>,
}

/// 视频上传表单
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct VideoUploadForm {
    #[schema(value_type = String, format = Binary)]
    video: Vec<u8>,
}

fn not_found(id: i32) -> AppError {
    AppError::not_found(format!("Application with ID {} not found", id))
}

/// 保存上传的视频，返回访问URL
async fn store_video(
    storage: &dyn Storage,
    policy: &UploadPolicy,
    file: &UploadedFile,
) -> AppResult<String> {
    validate_upload(policy, file)?;
    let filename = generate_filename(UploadKind::Video, &file.original_name);
    storage.save(&filename, &file.data).await
}

/// 创建申请
#[utoipa::path(
    post,
    path = "/applications",
    tag = "申请",
    request_body(content = CreateApplicationForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "创建成功", body = ApiResponse<ApplicationDetail>),
        (status = 400, description = "参数错误或文件类型不允许"),
        (status = 404, description = "网点不存在"),
        (status = 413, description = "文件过大")
    )
)]
pub async fn create_application(
    State(app_state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<ApplicationDetail>> {
    let policy = UploadPolicy::video(&app_state.config.upload);
    let form = MultipartForm::collect(multipart, &policy).await?;

    let request = CreateApplicationRequest {
        title: form.required("title")?,
        description: form.required("description")?,
        branch_id: form.parse("branch_id")?,
        amount: form.parse("amount")?,
        notes: form.text("notes").map(str::to_string).filter(|n| !n.is_empty()),
    };
    request.validate().map_err(AppError::validation)?;

    let db = app_state.db()?;
    if let Some(branch_id) = request.branch_id {
        if !BranchRepository::new(db.clone()).exists(branch_id).await? {
            return Err(AppError::not_found(format!(
                "Branch with ID {} not found",
                branch_id
            )));
        }
    }

    let video_url = match &form.file {
        Some(file) => Some(store_video(app_state.storage.as_ref(), &policy, file).await?),
        None => None,
    };

    let repo = ApplicationRepository::new(db.clone());
    let application = match repo.create(auth.0.id, request, video_url.clone()).await {
        Ok(application) => application,
        Err(e) => {
            remove_quietly(app_state.storage.as_ref(), video_url.as_deref()).await;
            return Err(e);
        }
    };

    tracing::info!(
        "用户 {} 创建申请 {} (视频: {})",
        auth.0.id,
        application.id,
        application.video_url.is_some()
    );

    let detail = repo
        .find_detail(application.id)
        .await?
        .ok_or_else(|| not_found(application.id))?;

    Ok(ApiResponse::success_with_message(
        detail,
        "Application created successfully",
    ))
}

/// 申请列表
#[utoipa::path(
    get,
    path = "/applications",
    tag = "申请",
    params(ApplicationListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<PagedResult<ApplicationDetail>>),
        (status = 401, description = "未认证")
    )
)]
pub async fn list_applications(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ApplicationListQuery>,
) -> AppResult<ApiResponse<PagedResult<ApplicationDetail>>> {
    let pagination = Pagination::from_query(query.page, query.page_size);
    let filter = ApplicationFilter {
        user_id: None,
        status: query.status,
        branch_id: query.branch_id,
    }
    .scoped_to(&auth.actor());

    let repo = ApplicationRepository::new(app_state.db()?.clone());
    let result = repo.list(&filter, &pagination).await?;

    Ok(ApiResponse::success_with_message(
        result,
        "Applications retrieved successfully",
    ))
}

/// 申请详情
#[utoipa::path(
    get,
    path = "/applications/{id}",
    tag = "申请",
    params(("id" = i32, Path, description = "申请ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<ApplicationDetail>),
        (status = 403, description = "无权查看"),
        (status = 404, description = "申请不存在")
    )
)]
pub async fn get_application(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<ApplicationDetail>> {
    let repo = ApplicationRepository::new(app_state.db()?.clone());
    let detail = repo.find_detail(id).await?.ok_or_else(|| not_found(id))?;

    detail.application.ensure_readable_by(&auth.actor())?;

    Ok(ApiResponse::success_with_message(
        detail,
        "Application retrieved successfully",
    ))
}

/// 更新申请
#[utoipa::path(
    patch,
    path = "/applications/{id}",
    tag = "申请",
    params(("id" = i32, Path, description = "申请ID")),
    request_body = UpdateApplicationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "更新成功", body = ApiResponse<ApplicationDetail>),
        (status = 403, description = "非本人申请或申请已不是待审核状态"),
        (status = 404, description = "申请不存在")
    )
)]
pub async fn update_application(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateApplicationRequest>,
) -> AppResult<ApiResponse<ApplicationDetail>> {
    let actor = auth.actor();
    let repo = ApplicationRepository::new(app_state.db()?.clone());

    let application = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
    application.ensure_updatable_by(&actor)?;

    let request = request.restricted_to(&actor);
    request.validate().map_err(AppError::validation)?;

    let updated = repo.update(id, request).await?;
    if updated.status != application.status {
        tracing::info!(
            "申请 {} 状态变更: {} -> {} (操作人 {})",
            id,
            application.status,
            updated.status,
            actor.id
        );
    }

    let detail = repo.find_detail(id).await?.ok_or_else(|| not_found(id))?;
    Ok(ApiResponse::success_with_message(
        detail,
        "Application updated successfully",
    ))
}

/// 删除申请
#[utoipa::path(
    delete,
    path = "/applications/{id}",
    tag = "申请",
    params(("id" = i32, Path, description = "申请ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "删除成功"),
        (status = 403, description = "非本人申请或申请已不是待审核状态"),
        (status = 404, description = "申请不存在")
    )
)]
pub async fn delete_application(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    let repo = ApplicationRepository::new(app_state.db()?.clone());

    let application = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
    application.ensure_deletable_by(&auth.actor())?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }

    remove_quietly(app_state.storage.as_ref(), application.video_url.as_deref()).await;
    tracing::info!("申请 {} 已被用户 {} 删除", id, auth.0.id);

    Ok(ApiResponse::<()>::success_empty(
        "Application deleted successfully",
    ))
}

/// 上传申请视频
#[utoipa::path(
    patch,
    path = "/applications/{id}/upload-video",
    tag = "申请",
    params(("id" = i32, Path, description = "申请ID")),
    request_body(content = VideoUploadForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "上传成功", body = ApiResponse<Application>),
        (status = 400, description = "未上传文件或文件类型不允许"),
        (status = 403, description = "非本人申请或当前状态不允许上传"),
        (status = 404, description = "申请不存在"),
        (status = 413, description = "文件过大")
    )
)]
pub async fn upload_application_video(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<ApiResponse<Application>> {
    let policy = UploadPolicy::video(&app_state.config.upload);
    let form = MultipartForm::collect(multipart, &policy).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::bad_request("No video file uploaded"))?;

    let repo = ApplicationRepository::new(app_state.db()?.clone());
    let application = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
    application.ensure_video_uploadable_by(&auth.actor())?;

    let video_url = store_video(app_state.storage.as_ref(), &policy, &file).await?;
    let updated = match repo.set_video(id, &video_url).await {
        Ok(updated) => updated,
        Err(e) => {
            remove_quietly(app_state.storage.as_ref(), Some(&video_url)).await;
            return Err(e);
        }
    };

    remove_quietly(app_state.storage.as_ref(), application.video_url.as_deref()).await;

    Ok(ApiResponse::success_with_message(
        updated,
        "Video uploaded successfully",
    ))
}
