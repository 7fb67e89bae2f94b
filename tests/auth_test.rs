#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};

use common::{create_user, setup};
use educenter_backend::models::users::Role;
use educenter_backend::services::notification_service::NotificationKind;
use educenter_backend::services::user_service::UserService;

#[actix_web::test]
async fn health_reports_database_status() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[actix_web::test]
async fn request_without_credentials_is_unauthorized() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn login_registers_new_telegram_user_as_parent() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let init_data = ctx.init_data(777_001, "Aziza");
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "init_data": init_data }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["telegram_id"], 777_001);
    assert_eq!(body["user"]["role"], "parent");

    // The issued token authenticates later requests.
    let token = body["token"].as_str().expect("token string").to_string();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["telegram_id"], 777_001);
}

#[actix_web::test]
async fn init_data_header_authenticates_existing_user() {
    let ctx = setup().await;
    let admin = create_user(&ctx.db, 42, Role::Admin).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("X-Telegram-Init-Data", ctx.init_data(42, "Boss")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], admin.id);
    assert_eq!(body["role"], "admin");
}

#[actix_web::test]
async fn tampered_init_data_is_rejected() {
    let ctx = setup().await;
    let app = init_app!(ctx);

    let tampered = ctx.init_data(1001, "Eve").replace("Eve", "Mallory");
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "init_data": tampered }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn blocked_user_cannot_log_in_or_use_a_token() {
    let ctx = setup().await;
    let parent = create_user(&ctx.db, 555, Role::Parent).await;
    let bearer = ctx.bearer(&parent);
    UserService::set_blocked(&ctx.db, parent.id, true).await.expect("block user");
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "init_data": ctx.init_data(555, "Blocked") }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", bearer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn role_guards_reject_other_roles() {
    let ctx = setup().await;
    let parent = create_user(&ctx.db, 9, Role::Parent).await;
    let app = init_app!(ctx);

    for uri in ["/api/admin/users", "/api/teacher/groups"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(("Authorization", ctx.bearer(&parent)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[actix_web::test]
async fn first_login_sends_a_single_welcome() {
    let mut ctx = setup().await;
    create_user(&ctx.db, 42, Role::Admin).await;
    let app = init_app!(ctx);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "init_data": ctx.init_data(777_002, "Malika") }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let sent = ctx.drain_outbox();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, 777_002);
    assert!(matches!(sent[0].kind, NotificationKind::Welcome));
    assert!(sent[0].text.contains("Malika"));

    // Known users authenticating by header are not greeted again.
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("X-Telegram-Init-Data", ctx.init_data(42, "Boss")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(ctx.drain_outbox().is_empty());
}
