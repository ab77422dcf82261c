use crate::{
    auth::AuthUser,
    dtos::video_dto::{CompleteVideoDto, CompleteVideoResponse, UserVideoResponse},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{
    extract::Path,
    routing::{get, post},
    Extension, Json, Router,
};
use database::parse_object_id;
use utils::AppResult;

/// 可观看的视频列表
#[utoipa::path(
    get,
    path = "/api/v1/videos",
    tag = "videos",
    responses(
        (status = 200, description = "激活状态的视频，附带是否已观看", body = Vec<UserVideoResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_videos(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<UserVideoResponse>>> {
    let videos = services.video.list_for_user(&auth.user_id).await?;

    Ok(Json(
        videos
            .into_iter()
            .map(|(video, watched)| UserVideoResponse {
                video: video.into(),
                watched,
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "视频ID")
    ),
    responses(
        (status = 200, description = "视频详情", body = UserVideoResponse),
        (status = 404, description = "视频不存在或已下架")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_video(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<UserVideoResponse>> {
    let id = parse_object_id(&id)?;
    let (video, watched) = services.video.get_for_user(&auth.user_id, &id).await?;

    Ok(Json(UserVideoResponse {
        video: video.into(),
        watched,
    }))
}

/// 上报观看完成并领取积分
///
/// 每个视频只奖励一次，观看时长不足时返回400
#[utoipa::path(
    post,
    path = "/api/v1/videos/{id}/complete",
    tag = "videos",
    params(
        ("id" = String, Path, description = "视频ID")
    ),
    request_body = CompleteVideoDto,
    responses(
        (status = 200, description = "积分已发放", body = CompleteVideoResponse),
        (status = 400, description = "观看时长不足或已领取"),
        (status = 403, description = "账户未激活")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_video(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<CompleteVideoDto>,
) -> AppResult<Json<CompleteVideoResponse>> {
    let id = parse_object_id(&id)?;
    let response = services
        .video
        .complete_video(&auth.user_id, &id, req.watched_seconds)
        .await?;

    Ok(Json(response))
}

pub struct VideoController;
impl VideoController {
    pub fn app() -> Router {
        Router::new()
            .route("/", get(list_videos))
            .route("/:id", get(get_video))
            .route("/:id/complete", post(complete_video))
    }
}
