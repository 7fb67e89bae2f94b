#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Datelike, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;

use common::{create_group, create_student, create_teacher, create_user, setup};
use educenter_backend::models::payments::{self, PaymentStatus};
use educenter_backend::models::users::Role;

#[actix_web::test]
async fn parent_lists_only_own_children() {
    let ctx = setup().await;
    let (_, teacher) = create_teacher(&ctx.db, 100, "Nazarova").await;
    let group = create_group(&ctx.db, teacher.id, "English A").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let other_parent = create_user(&ctx.db, 301, Role::Parent).await;
    let mine = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    create_student(&ctx.db, other_parent.id, group.id, "Lola").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/parent/children")
        .insert_header(("Authorization", ctx.bearer(&parent)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let children = body.as_array().expect("children list");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["id"], mine.id);
    assert_eq!(children[0]["full_name"], "Timur Karimov");
}

#[actix_web::test]
async fn another_parents_child_is_forbidden() {
    let ctx = setup().await;
    let (_, teacher) = create_teacher(&ctx.db, 100, "Nazarova").await;
    let group = create_group(&ctx.db, teacher.id, "English A").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let other_parent = create_user(&ctx.db, 301, Role::Parent).await;
    let theirs = create_student(&ctx.db, other_parent.id, group.id, "Lola").await;
    let app = init_app!(ctx);

    for uri in [
        format!("/api/parent/children/{}", theirs.id),
        format!("/api/parent/children/{}/grades", theirs.id),
        format!("/api/parent/children/{}/payments", theirs.id),
    ] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(("Authorization", ctx.bearer(&parent)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
    }

    let req = test::TestRequest::get()
        .uri("/api/parent/children/4242")
        .insert_header(("Authorization", ctx.bearer(&parent)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn child_details_include_group_and_teacher() {
    let ctx = setup().await;
    let (_, teacher) = create_teacher(&ctx.db, 100, "Nazarova").await;
    let group = create_group(&ctx.db, teacher.id, "English A").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let child = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/api/parent/children/{}", child.id))
        .insert_header(("Authorization", ctx.bearer(&parent)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["group"]["name"], "English A");
    assert_eq!(body["group"]["teacher"]["last_name"], "Nazarova");
    assert_eq!(body["statistics"]["total_classes"], 0);
    assert_eq!(body["statistics"]["attendance_percentage"], 0.0);
}

#[actix_web::test]
async fn past_due_unpaid_payment_reads_as_overdue() {
    let ctx = setup().await;
    let (_, teacher) = create_teacher(&ctx.db, 100, "Nazarova").await;
    let group = create_group(&ctx.db, teacher.id, "English A").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let child = create_student(&ctx.db, parent.id, group.id, "Timur").await;

    let last_month = Utc::now().date_naive() - Duration::days(40);
    payments::ActiveModel {
        student_id: Set(child.id),
        group_id: Set(group.id),
        amount: Set(Decimal::new(150_000, 0)),
        currency: Set("UZS".to_string()),
        month: Set(last_month.month() as i32),
        year: Set(last_month.year()),
        status: Set(PaymentStatus::Unpaid),
        due_date: Set(Some(last_month)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await
    .expect("insert payment");
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/api/parent/children/{}/payments", child.id))
        .insert_header(("Authorization", ctx.bearer(&parent)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["status"], "overdue");
    assert_eq!(body[0]["stored_status"], "unpaid");
}

#[actix_web::test]
async fn dashboard_has_a_card_per_child() {
    let ctx = setup().await;
    let (_, teacher) = create_teacher(&ctx.db, 100, "Nazarova").await;
    let group = create_group(&ctx.db, teacher.id, "English A").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    create_student(&ctx.db, parent.id, group.id, "Timur").await;
    create_student(&ctx.db, parent.id, group.id, "Lola").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/parent/dashboard")
        .insert_header(("Authorization", ctx.bearer(&parent)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["total_children"], 2);
    assert_eq!(body["children"][0]["group_name"], "English A");
}
