use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rewards Backend API",
        description = "基于 Rust 和 Axum 的视频积分与多级推荐奖励系统 API 文档",
        version = "1.0.0",
        contact(
            name = "API Support",
            email = "support@rewards.local"
        )
    ),
    paths(
        // System health check
        crate::api::health,
        // Auth endpoints
        crate::api::auth_controller::register,
        crate::api::auth_controller::login,
        // User endpoints
        crate::api::user_controller::me,
        crate::api::user_controller::dashboard,
        crate::api::user_controller::referrals,
        crate::api::user_controller::earnings,
        // Video endpoints
        crate::api::video_controller::list_videos,
        crate::api::video_controller::get_video,
        crate::api::video_controller::complete_video,
        // Withdrawal endpoints
        crate::api::withdrawal_controller::request_withdrawal,
        crate::api::withdrawal_controller::my_withdrawals,
        // Payment endpoints
        crate::api::payment_controller::initiate_payment,
        crate::api::payment_controller::verify_payment,
        crate::api::payment_controller::webhook,
        // Admin endpoints
        crate::api::admin_controller::stats,
        crate::api::admin_controller::list_users,
        crate::api::admin_controller::get_user,
        crate::api::admin_controller::update_user,
        crate::api::admin_controller::delete_user,
        crate::api::admin_controller::list_videos,
        crate::api::admin_controller::create_video,
        crate::api::admin_controller::update_video,
        crate::api::admin_controller::delete_video,
        crate::api::admin_controller::list_withdrawals,
        crate::api::admin_controller::approve_withdrawal,
        crate::api::admin_controller::reject_withdrawal,
        crate::api::admin_controller::list_earnings,
        crate::api::admin_controller::get_earning,
        crate::api::admin_controller::update_earning,
        crate::api::admin_controller::recalculate_earning,
        crate::api::admin_controller::reset_earning,
        crate::api::admin_controller::recalculate_all,
        crate::api::admin_controller::upload_media,
        crate::api::admin_controller::delete_media,
    ),
    components(
        schemas(
            // Database models
            database::user::model::UserRole,
            database::user::model::PaymentStatus,
            database::user::model::UserStats,
            database::withdrawal::model::PaymentMethod,
            database::withdrawal::model::WithdrawalStatus,
            database::withdrawal::model::WithdrawalStats,
            // DTOs
            crate::dtos::user_dto::RegisterDto,
            crate::dtos::user_dto::LoginDto,
            crate::dtos::user_dto::AuthResponse,
            crate::dtos::user_dto::UserResponse,
            crate::dtos::user_dto::VideoWatchResponse,
            crate::dtos::user_dto::ReferralResponse,
            crate::dtos::user_dto::DashboardResponse,
            crate::dtos::user_dto::AdminUpdateUserDto,
            crate::dtos::user_dto::UserListResponse,
            crate::dtos::earning_dto::ReferralEarningResponse,
            crate::dtos::earning_dto::LevelPayoutsResponse,
            crate::dtos::earning_dto::MyEarningsResponse,
            crate::dtos::earning_dto::UpdateEarningDto,
            crate::dtos::earning_dto::RecalculationSummary,
            crate::dtos::video_dto::CreateVideoDto,
            crate::dtos::video_dto::UpdateVideoDto,
            crate::dtos::video_dto::CompleteVideoDto,
            crate::dtos::video_dto::VideoResponse,
            crate::dtos::video_dto::UserVideoResponse,
            crate::dtos::video_dto::CompleteVideoResponse,
            crate::dtos::withdrawal_dto::CreateWithdrawalDto,
            crate::dtos::withdrawal_dto::ProcessWithdrawalDto,
            crate::dtos::withdrawal_dto::WithdrawalResponse,
            crate::dtos::payment_dto::InitiatePaymentResponse,
            crate::dtos::payment_dto::VerifyPaymentResponse,
            crate::dtos::payment_dto::PaymentWebhookPayload,
            crate::dtos::payment_dto::PaymentWebhookData,
            crate::dtos::payment_dto::WebhookAck,
            crate::dtos::admin_dto::AdminStatsResponse,
            crate::dtos::admin_dto::MediaUploadDto,
            crate::dtos::admin_dto::MediaUploadResponse,
            crate::dtos::admin_dto::MediaDeleteResponse,
            crate::dtos::admin_dto::MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "系统状态", description = "系统健康检查和状态监控"),
        (name = "auth", description = "注册与登录"),
        (name = "users", description = "个人信息、面板与推荐收益"),
        (name = "videos", description = "视频观看与积分"),
        (name = "withdrawals", description = "提现申请"),
        (name = "payment", description = "Flutterwave 激活支付"),
        (name = "admin", description = "管理后台")
    )
)]
pub struct ApiDoc;

/// 注册 Bearer JWT 认证方式
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/v1/auth/register"));
        assert!(doc.paths.paths.contains_key("/api/v1/payment/webhook"));
        assert!(doc
            .paths
            .paths
            .contains_key("/api/v1/admin/multilevel-earnings/{user_id}/reset"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
