use crate::{
    auth::AuthUser,
    dtos::{
        admin_dto::{AdminStatsResponse, MediaDeleteResponse, MediaUploadDto, MediaUploadResponse, MessageResponse},
        earning_dto::{RecalculationSummary, ReferralEarningResponse, UpdateEarningDto},
        user_dto::{AdminUpdateUserDto, UserListQuery, UserListResponse, UserResponse},
        video_dto::{CreateVideoDto, UpdateVideoDto, VideoResponse},
        withdrawal_dto::{ProcessWithdrawalDto, WithdrawalListQuery, WithdrawalResponse},
    },
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use database::{parse_object_id, user::model::UserQuery, withdrawal::model::WithdrawalStatus};
use tracing::{info, warn};
use utils::{AppError, AppResult};
use validator::Validate;

//////////////////////////////////////////////////////////////////////
// 统计
//////////////////////////////////////////////////////////////////////

/// 后台首页汇总
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "用户、视频与提现统计", body = AdminStatsResponse),
        (status = 403, description = "权限不足")
    ),
    security(("bearer_auth" = []))
)]
pub async fn stats(Extension(services): Extension<Services>) -> AppResult<Json<AdminStatsResponse>> {
    Ok(Json(services.user.stats().await?))
}

//////////////////////////////////////////////////////////////////////
// 用户管理
//////////////////////////////////////////////////////////////////////

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    params(UserListQuery),
    responses(
        (status = 200, description = "分页用户列表", body = UserListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    Extension(services): Extension<Services>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<UserListResponse>> {
    let query = UserQuery::from(query);
    let (page, limit) = (query.page, query.limit);
    let (users, total) = services.user.list_users(query).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
        page,
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "用户详情", body = UserResponse),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let id = parse_object_id(&id)?;

    Ok(Json(services.user.get_user(&id).await?.into()))
}

/// 编辑用户资料、角色、余额等
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "用户ID")
    ),
    request_body = AdminUpdateUserDto,
    responses(
        (status = 200, description = "更新后的用户", body = UserResponse),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<AdminUpdateUserDto>,
) -> AppResult<Json<UserResponse>> {
    let id = parse_object_id(&id)?;
    warn!("🛠️ 管理员 {} 修改用户 {}: {:?}", admin.user_id, id, req);

    let user = services.user.update_user(&id, req.into()).await?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "用户已删除", body = MessageResponse),
        (status = 400, description = "不能删除自己"),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_object_id(&id)?;
    services.user.delete_user(&id, &admin.user_id).await?;
    warn!("🗑️ 管理员 {} 删除了用户 {}", admin.user_id, id);

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

//////////////////////////////////////////////////////////////////////
// 视频管理
//////////////////////////////////////////////////////////////////////

/// 全部视频（含未激活）
#[utoipa::path(
    get,
    path = "/api/v1/admin/videos",
    tag = "admin",
    responses(
        (status = 200, description = "视频列表", body = Vec<VideoResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_videos(Extension(services): Extension<Services>) -> AppResult<Json<Vec<VideoResponse>>> {
    let videos = services.video.list_videos().await?;

    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/videos",
    tag = "admin",
    request_body = CreateVideoDto,
    responses(
        (status = 201, description = "视频已创建", body = VideoResponse),
        (status = 400, description = "参数错误")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_video(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
    ValidationExtractor(req): ValidationExtractor<CreateVideoDto>,
) -> AppResult<(StatusCode, Json<VideoResponse>)> {
    let video = services.video.create_video(&admin.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(video.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/videos/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "视频ID")
    ),
    request_body = UpdateVideoDto,
    responses(
        (status = 200, description = "更新后的视频", body = VideoResponse),
        (status = 404, description = "视频不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_video(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<UpdateVideoDto>,
) -> AppResult<Json<VideoResponse>> {
    let id = parse_object_id(&id)?;
    let video = services.video.update_video(&id, req.into()).await?;

    Ok(Json(video.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/videos/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "视频ID")
    ),
    responses(
        (status = 200, description = "视频已删除", body = MessageResponse),
        (status = 404, description = "视频不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_video(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_object_id(&id)?;
    let video = services.video.delete_video(&id).await?;
    info!("🗑️ 视频已删除: {}", video.title);

    Ok(Json(MessageResponse::new("Video deleted successfully")))
}

//////////////////////////////////////////////////////////////////////
// 提现审批
//////////////////////////////////////////////////////////////////////

#[utoipa::path(
    get,
    path = "/api/v1/admin/withdrawals",
    tag = "admin",
    params(WithdrawalListQuery),
    responses(
        (status = 200, description = "提现列表", body = Vec<WithdrawalResponse>),
        (status = 400, description = "状态参数无效")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_withdrawals(
    Extension(services): Extension<Services>,
    Query(query): Query<WithdrawalListQuery>,
) -> AppResult<Json<Vec<WithdrawalResponse>>> {
    let status = query
        .status
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<WithdrawalStatus>())
        .transpose()
        .map_err(AppError::BadRequest)?;

    let withdrawals = services.withdrawal.list_withdrawals(status).await?;

    Ok(Json(withdrawals.into_iter().map(WithdrawalResponse::from).collect()))
}

/// 审批备注可省略请求体
fn process_notes(body: Option<Json<ProcessWithdrawalDto>>) -> AppResult<Option<String>> {
    match body {
        Some(Json(req)) => {
            req.validate()?;
            Ok(req.notes)
        }
        None => Ok(None),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/withdrawals/{id}/approve",
    tag = "admin",
    params(
        ("id" = String, Path, description = "提现ID")
    ),
    request_body = ProcessWithdrawalDto,
    responses(
        (status = 200, description = "已批准", body = WithdrawalResponse),
        (status = 400, description = "提现已处理"),
        (status = 404, description = "提现不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_withdrawal(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Option<Json<ProcessWithdrawalDto>>,
) -> AppResult<Json<WithdrawalResponse>> {
    let id = parse_object_id(&id)?;
    let notes = process_notes(body)?;
    let withdrawal = services.withdrawal.approve(&id, &admin.user_id, notes).await?;

    Ok(Json(withdrawal.into()))
}

/// 驳回提现，金额退回用户余额
#[utoipa::path(
    put,
    path = "/api/v1/admin/withdrawals/{id}/reject",
    tag = "admin",
    params(
        ("id" = String, Path, description = "提现ID")
    ),
    request_body = ProcessWithdrawalDto,
    responses(
        (status = 200, description = "已驳回", body = WithdrawalResponse),
        (status = 400, description = "提现已处理"),
        (status = 404, description = "提现不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_withdrawal(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Option<Json<ProcessWithdrawalDto>>,
) -> AppResult<Json<WithdrawalResponse>> {
    let id = parse_object_id(&id)?;
    let notes = process_notes(body)?;
    let withdrawal = services.withdrawal.reject(&id, &admin.user_id, notes).await?;

    Ok(Json(withdrawal.into()))
}

//////////////////////////////////////////////////////////////////////
// 多级推荐收益
//////////////////////////////////////////////////////////////////////

#[utoipa::path(
    get,
    path = "/api/v1/admin/multilevel-earnings",
    tag = "admin",
    responses(
        (status = 200, description = "全部收益记录（附用户信息）", body = Vec<ReferralEarningResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_earnings(
    Extension(services): Extension<Services>,
) -> AppResult<Json<Vec<ReferralEarningResponse>>> {
    let earnings = services.referral.list_earnings().await?;

    Ok(Json(
        earnings
            .into_iter()
            .map(|(record, user)| {
                let response = ReferralEarningResponse::from(record);
                match user {
                    Some(user) => response.with_user(&user),
                    None => response,
                }
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/multilevel-earnings/{user_id}",
    tag = "admin",
    params(
        ("user_id" = String, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "收益记录，不存在时现算", body = ReferralEarningResponse),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_earning(
    Extension(services): Extension<Services>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ReferralEarningResponse>> {
    let user_id = parse_object_id(&user_id)?;
    let user = services.user.get_user(&user_id).await?;
    let record = services.referral.get_or_calculate(&user_id).await?;

    Ok(Json(ReferralEarningResponse::from(record).with_user(&user)))
}

/// 手动调整收益，调整后的记录在重算时保留金额
#[utoipa::path(
    put,
    path = "/api/v1/admin/multilevel-earnings/{user_id}",
    tag = "admin",
    params(
        ("user_id" = String, Path, description = "用户ID")
    ),
    request_body = UpdateEarningDto,
    responses(
        (status = 200, description = "调整后的记录", body = ReferralEarningResponse),
        (status = 400, description = "没有需要修改的字段"),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_earning(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<UpdateEarningDto>,
) -> AppResult<Json<ReferralEarningResponse>> {
    let user_id = parse_object_id(&user_id)?;
    warn!("✏️ 管理员 {} 手动调整 {} 的推荐收益", admin.user_id, user_id);

    let record = services.referral.update_earning(&user_id, req.into()).await?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/multilevel-earnings/{user_id}/recalculate",
    tag = "admin",
    params(
        ("user_id" = String, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "重算后的记录", body = ReferralEarningResponse),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn recalculate_earning(
    Extension(services): Extension<Services>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ReferralEarningResponse>> {
    let user_id = parse_object_id(&user_id)?;
    let record = services.referral.recalculate_user(&user_id).await?;

    Ok(Json(record.into()))
}

/// 清除手动调整，恢复为按推荐树计算
#[utoipa::path(
    post,
    path = "/api/v1/admin/multilevel-earnings/{user_id}/reset",
    tag = "admin",
    params(
        ("user_id" = String, Path, description = "用户ID")
    ),
    responses(
        (status = 200, description = "重置后的记录", body = ReferralEarningResponse),
        (status = 404, description = "用户不存在")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reset_earning(
    Extension(services): Extension<Services>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ReferralEarningResponse>> {
    let user_id = parse_object_id(&user_id)?;
    let record = services.referral.reset_override(&user_id).await?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/multilevel-earnings/recalculate-all",
    tag = "admin",
    responses(
        (status = 200, description = "全量重算结果", body = RecalculationSummary)
    ),
    security(("bearer_auth" = []))
)]
pub async fn recalculate_all(
    Extension(services): Extension<Services>,
    Extension(admin): Extension<AuthUser>,
) -> AppResult<Json<RecalculationSummary>> {
    info!("🔄 管理员 {} 触发全量收益重算", admin.user_id);
    let summary = services.referral.recalculate_all().await?;

    Ok(Json(summary))
}

//////////////////////////////////////////////////////////////////////
// 媒体
//////////////////////////////////////////////////////////////////////

/// 上传图片到 Cloudinary
#[utoipa::path(
    post,
    path = "/api/v1/admin/media",
    tag = "admin",
    request_body = MediaUploadDto,
    responses(
        (status = 201, description = "上传成功", body = MediaUploadResponse),
        (status = 502, description = "Cloudinary 异常")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_media(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<MediaUploadDto>,
) -> AppResult<(StatusCode, Json<MediaUploadResponse>)> {
    let uploaded = services.media.upload(&req.file, req.folder.as_deref()).await?;

    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// 删除 Cloudinary 上的资源，public_id 可以包含目录
#[utoipa::path(
    delete,
    path = "/api/v1/admin/media/{public_id}",
    tag = "admin",
    params(
        ("public_id" = String, Path, description = "Cloudinary public_id")
    ),
    responses(
        (status = 200, description = "删除结果", body = MediaDeleteResponse),
        (status = 502, description = "Cloudinary 异常")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_media(
    Extension(services): Extension<Services>,
    Path(public_id): Path<String>,
) -> AppResult<Json<MediaDeleteResponse>> {
    let public_id = public_id.trim_start_matches('/');
    if public_id.is_empty() {
        return Err(AppError::BadRequest("public_id is required.".to_string()));
    }

    Ok(Json(services.media.destroy(public_id).await?))
}

pub struct AdminController;
impl AdminController {
    pub fn app() -> Router {
        Router::new()
            .route("/stats", get(stats))
            .route("/users", get(list_users))
            .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
            .route("/videos", get(list_videos).post(create_video))
            .route("/videos/:id", put(update_video).delete(delete_video))
            .route("/withdrawals", get(list_withdrawals))
            .route("/withdrawals/:id/approve", put(approve_withdrawal))
            .route("/withdrawals/:id/reject", put(reject_withdrawal))
            .route("/multilevel-earnings", get(list_earnings))
            .route("/multilevel-earnings/recalculate-all", post(recalculate_all))
            .route("/multilevel-earnings/:user_id", get(get_earning).put(update_earning))
            .route("/multilevel-earnings/:user_id/recalculate", post(recalculate_earning))
            .route("/multilevel-earnings/:user_id/reset", post(reset_earning))
            .route("/media", post(upload_media))
            .route("/media/*public_id", delete(delete_media))
    }
}
