use crate::{router::AppRouter, services::test_support::TestContext};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use database::user::repository::UserRepositoryTrait;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(ctx: &TestContext) -> Router {
    AppRouter::new(ctx.services.clone())
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    (status, json)
}

#[tokio::test]
async fn test_health_and_fallback() {
    let ctx = TestContext::new();

    for path in ["/api/v1", "/api/v1/"] {
        let response = app(&ctx).oneshot(request("GET", path, None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
    }

    let (status, body) = send(app(&ctx), request("GET", "/api/v1/nothing-here", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["errors"]["message"].is_array());
}

#[tokio::test]
async fn test_register_then_fetch_profile() {
    let ctx = TestContext::new();
    let referrer = ctx.store.insert_user("referrer@example.com", None, true).await;
    let code = ctx.store.get_user(&referrer).await.unwrap().unwrap().referral_code;

    let (status, body) = send(
        app(&ctx),
        request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "new@example.com",
                "password": "secret1",
                "fullName": "New User",
                "referralCode": code
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["referredBy"], referrer.to_hex());
    assert_eq!(body["user"]["isActive"], false);

    let token = body["token"].as_str().unwrap().to_string();
    let (status, me) = send(app(&ctx), request("GET", "/api/v1/users/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "new@example.com");
    assert!(me.get("password").is_none());

    let (status, _) = send(
        app(&ctx),
        request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "new@example.com", "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_invalid_body() {
    let ctx = TestContext::new();

    let (status, body) = send(
        app(&ctx),
        request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "nope", "password": "1", "fullName": "" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["errors"]["message"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    for uri in ["/api/v1/users/me", "/api/v1/videos", "/api/v1/withdrawals/me", "/api/v1/admin/stats"] {
        let (status, body) = send(app(&ctx), request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert!(body["errors"]["message"].is_array());
    }

    let (status, _) = send(app(&ctx), request("GET", "/api/v1/users/me", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let ctx = TestContext::new();
    let user = ctx.store.insert_user("user@example.com", None, true).await;
    let admin = ctx.store.insert_admin("admin@example.com").await;

    let user_token = ctx.token_for(&user).await;
    let (status, _) = send(app(&ctx), request("GET", "/api/v1/admin/stats", Some(&user_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = ctx.token_for(&admin).await;
    let (status, stats) = send(app(&ctx), request("GET", "/api/v1/admin/stats", Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["users"]["totalUsers"], 2);
}

#[tokio::test]
async fn test_withdrawal_request_and_rejection_over_http() {
    let ctx = TestContext::new();
    let user = ctx.store.insert_user("user@example.com", None, true).await;
    let admin = ctx.store.insert_admin("admin@example.com").await;
    ctx.store.set_earnings(&user, 6000).await;

    let user_token = ctx.token_for(&user).await;
    let admin_token = ctx.token_for(&admin).await;

    let (status, withdrawal) = send(
        app(&ctx),
        request(
            "POST",
            "/api/v1/withdrawals",
            Some(&user_token),
            Some(json!({
                "amount": 5000,
                "paymentMethod": "bank_transfer",
                "accountDetails": { "bank": "GTB", "accountNumber": "0123456789" }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(withdrawal["status"], "pending");

    let (status, _) = send(
        app(&ctx),
        request("GET", "/api/v1/admin/withdrawals?status=bogus", Some(&admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, pending) = send(
        app(&ctx),
        request("GET", "/api/v1/admin/withdrawals?status=pending", Some(&admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let id = withdrawal["id"].as_str().unwrap();
    let (status, rejected) = send(
        app(&ctx),
        request(
            "PUT",
            &format!("/api/v1/admin/withdrawals/{}/reject", id),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");

    let (_, me) = send(app(&ctx), request("GET", "/api/v1/users/me", Some(&user_token), None)).await;
    assert_eq!(me["earnings"], 6000);
}

#[tokio::test]
async fn test_video_completion_over_http() {
    let ctx = TestContext::new();
    let user = ctx.store.insert_user("viewer@example.com", None, true).await;
    let video = ctx.store.insert_video(40, 30, true).await;
    let token = ctx.token_for(&user).await;
    let uri = format!("/api/v1/videos/{}/complete", video.to_hex());

    let (status, _) = send(
        app(&ctx),
        request("POST", &uri, Some(&token), Some(json!({ "watchedSeconds": 10 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app(&ctx),
        request("POST", &uri, Some(&token), Some(json!({ "watchedSeconds": 31 }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pointsEarned"], 40);

    let (status, videos) = send(app(&ctx), request("GET", "/api/v1/videos", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(videos[0]["watched"], true);

    let (status, _) = send(
        app(&ctx),
        request("GET", "/api/v1/videos/not-an-id", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_is_public_but_signed() {
    let ctx = TestContext::new();
    let payload = json!({
        "event": "transfer.completed",
        "data": { "id": 1, "status": "successful" }
    });

    let (status, _) = send(
        app(&ctx),
        request("POST", "/api/v1/payment/webhook", None, Some(payload.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let hash = ctx.config.flutterwave_webhook_hash.clone().unwrap();
    let signed = Request::builder()
        .method("POST")
        .uri("/api/v1/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("verif-hash", hash)
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, ack) = send(app(&ctx), signed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ignored");

    // 其余支付接口仍需登录
    let (status, _) = send(app(&ctx), request("POST", "/api/v1/payment/initiate", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_media_delete_keeps_folder() {
    let ctx = TestContext::new();
    let admin = ctx.store.insert_admin("admin@example.com").await;
    let token = ctx.token_for(&admin).await;

    let (status, body) = send(
        app(&ctx),
        request("DELETE", "/api/v1/admin/media/thumbnails/intro", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicId"], "thumbnails/intro");
    assert_eq!(*ctx.media.destroyed.lock().unwrap(), vec!["thumbnails/intro".to_string()]);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let ctx = TestContext::new();
    let admin = ctx.store.insert_admin("admin@example.com").await;
    let token = ctx.token_for(&admin).await;

    let (status, _) = send(
        app(&ctx),
        request("DELETE", &format!("/api/v1/admin/users/{}", admin.to_hex()), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_user_list_with_huge_page() {
    let ctx = TestContext::new();
    let admin = ctx.store.insert_admin("admin@example.com").await;
    let token = ctx.token_for(&admin).await;

    let (status, body) = send(
        app(&ctx),
        request(
            "GET",
            "/api/v1/admin/users?page=18446744073709551615&limit=100",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], database::user::model::MAX_PAGE);
    assert_eq!(body["total"], 1);
    assert!(body["users"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_multilevel_earnings_routes() {
    let ctx = TestContext::new();
    let admin = ctx.store.insert_admin("admin@example.com").await;
    let root = ctx.store.insert_user("root@example.com", None, true).await;
    let a = ctx.store.insert_user("a@example.com", Some(root), true).await;
    ctx.store.insert_user("b@example.com", Some(a), true).await;
    let token = ctx.token_for(&admin).await;
    let record_uri = format!("/api/v1/admin/multilevel-earnings/{}", root.to_hex());

    let (status, summary) = send(
        app(&ctx),
        request("POST", "/api/v1/admin/multilevel-earnings/recalculate-all", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["processed"], 4);
    assert_eq!(summary["preservedOverrides"], 0);

    let (status, record) = send(app(&ctx), request("GET", &record_uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["level1Count"], 1);
    assert_eq!(record["level2Count"], 1);
    assert_eq!(record["totalEarnings"], 3900);
    assert_eq!(record["isManuallyEdited"], false);

    let (status, _) = send(app(&ctx), request("PUT", &record_uri, Some(&token), Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, edited) = send(
        app(&ctx),
        request(
            "PUT",
            &record_uri,
            Some(&token),
            Some(json!({ "level1Earnings": 5000, "notes": "campaign bonus" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["level1Earnings"], 5000);
    assert_eq!(edited["totalEarnings"], 6100);
    assert_eq!(edited["isManuallyEdited"], true);
    assert_eq!(edited["notes"], "campaign bonus");

    // 全量重算保留手动收益
    let (status, summary) = send(
        app(&ctx),
        request("POST", "/api/v1/admin/multilevel-earnings/recalculate-all", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["preservedOverrides"], 1);

    let (_, record) = send(app(&ctx), request("GET", &record_uri, Some(&token), None)).await;
    assert_eq!(record["totalEarnings"], 6100);
    assert_eq!(record["level1Count"], 1);

    let (status, reset) = send(
        app(&ctx),
        request("POST", &format!("{}/reset", record_uri), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["totalEarnings"], 3900);
    assert_eq!(reset["isManuallyEdited"], false);
}
