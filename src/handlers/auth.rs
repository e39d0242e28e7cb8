use super::AppState;
use crate::{
    auth::{hash_password, verify_password},
    error::{AppError, AppResult},
    file_processing::{MultipartForm, UploadKind, UploadPolicy, generate_filename, validate_upload},
    middleware::AuthUser,
    models::{
        AuthResponse, LoginRequest, MyIdSummary, NewUser, RegisterRequest, Role, SendOtpRequest,
        SendOtpResponse, UserProfile, VerifyMyIdRequest, VerifyOtpRequest,
    },
    repositories::{MyIdRepository, UserRepository},
    response::ApiResponse,
    services::{OtpCheck, check_otp, generate_otp, otp},
    storage::remove_quietly,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use chrono::Utc;
use utoipa::ToSchema;

/// 头像上传表单
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AvatarUploadForm {
    /// 图片文件（jpg、jpeg、png、gif、webp，最大5MB）
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// 用户注册
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "认证",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "注册成功", body = ApiResponse<AuthResponse>),
        (status = 400, description = "参数错误或邮箱、手机号已注册")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    request.validate().map_err(AppError::validation)?;
    let request = request.normalized();

    let repo = UserRepository::new(app_state.db()?.clone());

    if repo.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::bad_request("User with this email already exists"));
    }

    if let Some(phone) = &request.phone {
        if repo.find_by_phone(phone).await?.is_some() {
            return Err(AppError::bad_request("User with this phone already exists"));
        }
    }

    let password_hash = hash_password(&request.password)?;
    let user = repo
        .create(NewUser {
            email: request.email,
            name: request.name,
            phone: request.phone,
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(|e| {
            // 并发注册时由唯一约束兜底
            if e.is_unique_violation() {
                AppError::bad_request("User with this email or phone already exists")
            } else {
                e
            }
        })?;

    tracing::info!("新用户注册: id={}, email={}", user.id, user.email);

    let access_token = app_state.jwt.issue(&user)?;
    Ok(ApiResponse::success_with_message(
        AuthResponse {
            user: UserProfile::from(&user),
            access_token,
        },
        "User registered successfully",
    ))
}

/// 用户登录
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "认证",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = ApiResponse<AuthResponse>),
        (status = 401, description = "邮箱或密码错误")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    request.validate().map_err(AppError::validation)?;

    let repo = UserRepository::new(app_state.db()?.clone());
    let email = request.email.trim().to_lowercase();

    let user = repo
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let access_token = app_state.jwt.issue(&user)?;
    Ok(ApiResponse::success_with_message(
        AuthResponse {
            user: UserProfile::from(&user),
            access_token,
        },
        "Login successful",
    ))
}

/// 发送手机验证码
#[utoipa::path(
    post,
    path = "/auth/send-otp",
    tag = "认证",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "验证码已发送", body = ApiResponse<SendOtpResponse>),
        (status = 400, description = "手机号未注册或已验证")
    )
)]
pub async fn send_otp(
    State(app_state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> AppResult<ApiResponse<SendOtpResponse>> {
    request.validate().map_err(AppError::validation)?;

    let repo = UserRepository::new(app_state.db()?.clone());
    let phone = request.phone.trim();

    let user = repo
        .find_by_phone(phone)
        .await?
        .ok_or_else(|| AppError::bad_request("User with this phone not found"))?;

    if user.is_verified {
        return Err(AppError::bad_request("Phone already verified"));
    }

    let ttl_seconds = app_state.config.otp.ttl_seconds;
    let code = generate_otp();
    repo.set_otp(user.id, &code, otp::expires_at(Utc::now(), ttl_seconds))
        .await?;

    // 尚未接入短信网关，验证码写入日志
    tracing::info!("手机号 {} 的验证码: {} ({}秒内有效)", phone, code, ttl_seconds);

    let message = format!(
        "OTP sent successfully. Valid for {}.",
        describe_duration(ttl_seconds)
    );

    Ok(ApiResponse::success_with_message(
        SendOtpResponse {
            expires_in_seconds: ttl_seconds,
            otp: app_state.config.otp.expose_in_response.then_some(code),
        },
        message,
    ))
}

/// 校验手机验证码
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "认证",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "手机号验证成功", body = ApiResponse<AuthResponse>),
        (status = 400, description = "验证码未发送、已过期或不正确")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    request.validate().map_err(AppError::validation)?;

    let repo = UserRepository::new(app_state.db()?.clone());

    let user = repo
        .find_by_phone(request.phone.trim())
        .await?
        .ok_or_else(|| AppError::bad_request("User not found"))?;

    if user.is_verified {
        return Err(AppError::bad_request("Phone already verified"));
    }

    let now = Utc::now();
    match check_otp(user.otp.as_deref(), user.otp_expires_at, &request.otp, now) {
        OtpCheck::Valid => {}
        OtpCheck::Expired => {
            repo.clear_otp(user.id).await?;
            return Err(AppError::bad_request(OtpCheck::Expired.message()));
        }
        rejected => return Err(AppError::bad_request(rejected.message())),
    }

    // 条件更新失败说明验证码已被并发请求使用或刚好过期
    let user = repo
        .consume_otp(user.id, request.otp.trim(), now)
        .await?
        .ok_or_else(|| AppError::bad_request(OtpCheck::Missing.message()))?;

    tracing::info!("用户 {} 手机号验证成功", user.id);

    let access_token = app_state.jwt.issue(&user)?;
    Ok(ApiResponse::success_with_message(
        AuthResponse {
            user: UserProfile::from(&user),
            access_token,
        },
        "Phone verified successfully",
    ))
}

/// MyID 身份核验
#[utoipa::path(
    post,
    path = "/auth/verify-myid",
    tag = "认证",
    request_body = VerifyMyIdRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "核验成功", body = ApiResponse<MyIdSummary>),
        (status = 400, description = "MyID 核验失败"),
        (status = 401, description = "未认证")
    )
)]
pub async fn verify_myid(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<VerifyMyIdRequest>,
) -> AppResult<ApiResponse<MyIdSummary>> {
    request.validate().map_err(AppError::validation)?;

    let profile = app_state
        .identity_provider
        .verify(request.code.trim())
        .await?;

    let repo = MyIdRepository::new(app_state.db()?.clone());
    let record = repo.upsert_verified(auth.0.id, profile).await?;

    tracing::info!(
        "用户 {} 通过 MyID 核验 ({}), response_id={}",
        auth.0.id,
        app_state.identity_provider.name(),
        record.response_id
    );

    Ok(ApiResponse::success_with_message(
        MyIdSummary::from(record),
        "MyID verification successful",
    ))
}

/// 当前用户信息
#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "认证",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<UserProfile>),
        (status = 401, description = "未认证")
    )
)]
pub async fn profile(auth: AuthUser) -> ApiResponse<UserProfile> {
    ApiResponse::success(auth.0)
}

/// 上传头像
#[utoipa::path(
    patch,
    path = "/auth/upload-avatar",
    tag = "认证",
    request_body(content = AvatarUploadForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "头像上传成功", body = ApiResponse<UserProfile>),
        (status = 400, description = "未上传文件或文件类型不允许"),
        (status = 413, description = "文件过大")
    )
)]
pub async fn upload_avatar(
    State(app_state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<UserProfile>> {
    let policy = UploadPolicy::image(&app_state.config.upload);
    let form = MultipartForm::collect(multipart, &policy).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    validate_upload(&policy, &file)?;

    let repo = UserRepository::new(app_state.db()?.clone());

    let filename = generate_filename(UploadKind::Image, &file.original_name);
    let image_url = app_state.storage.save(&filename, &file.data).await?;

    let user = match repo.update_avatar(auth.0.id, &image_url).await {
        Ok(user) => user,
        Err(e) => {
            remove_quietly(app_state.storage.as_ref(), Some(&image_url)).await;
            return Err(e);
        }
    };

    if auth.0.image_url.as_deref() != Some(image_url.as_str()) {
        remove_quietly(app_state.storage.as_ref(), auth.0.image_url.as_deref()).await;
    }

    Ok(ApiResponse::success_with_message(
        UserProfile::from(&user),
        "Avatar uploaded successfully",
    ))
}

/// 将秒数描述为可读时长
fn describe_duration(seconds: i64) -> String {
    match seconds {
        s if s % 60 == 0 && s / 60 == 1 => "1 minute".to_string(),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}
