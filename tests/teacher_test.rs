#[macro_use]
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test;
use async_trait::async_trait;
use serde_json::{json, Value};

use common::{create_group, create_student, create_teacher, create_user, setup};
use educenter_backend::models::users::Role;
use educenter_backend::services::notification_service::{
    Notification, NotificationKind, NotificationService, Notifier, NotifyError,
};

/// Telegram backend that rejects every message.
struct Unreachable {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Notifier for Unreachable {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Api("Bad Request: chat not found".into()))
    }
}

#[actix_web::test]
async fn teacher_sees_only_own_groups() {
    let ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let (_, other) = create_teacher(&ctx.db, 200, "Other").await;
    let mine = create_group(&ctx.db, teacher.id, "Algebra A").await;
    create_group(&ctx.db, other.id, "Physics B").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/teacher/groups")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let groups = body.as_array().expect("group list");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["id"], mine.id);
}

#[actix_web::test]
async fn marking_attendance_outside_own_groups_is_refused() {
    let ctx = setup().await;
    let (teacher_user, _) = create_teacher(&ctx.db, 100, "Own").await;
    let (_, other) = create_teacher(&ctx.db, 200, "Other").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let foreign_group = create_group(&ctx.db, other.id, "Physics B").await;
    let student = create_student(&ctx.db, parent.id, foreign_group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "student_id": student.id, "group_id": foreign_group.id, "status": "present" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "student_id": student.id, "group_id": 9999, "status": "present" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn absence_notifies_parent_once() {
    let mut ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let student = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let mark = json!({
        "student_id": student.id,
        "group_id": group.id,
        "date": "2026-03-02",
        "status": "absent"
    });

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(&mark)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let sent = ctx.drain_outbox();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, parent.telegram_id);
    assert!(matches!(sent[0].kind, NotificationKind::Absence));
    assert!(sent[0].text.contains("02.03.2026"));

    // Same day again: the record is updated in place and nobody is re-notified.
    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(&mark)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(ctx.drain_outbox().is_empty());

    let req = test::TestRequest::get()
        .uri(&format!("/api/teacher/attendance/group/{}", group.id))
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .to_request();
    let records: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(records.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn present_mark_sends_nothing() {
    let mut ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let student = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "student_id": student.id, "group_id": group.id, "status": "late" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(ctx.drain_outbox().is_empty());
}

#[actix_web::test]
async fn bulk_attendance_skips_students_outside_the_group() {
    let mut ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let other_group = create_group(&ctx.db, teacher.id, "Algebra B").await;
    let first = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let second = create_student(&ctx.db, parent.id, group.id, "Lola").await;
    let outsider = create_student(&ctx.db, parent.id, other_group.id, "Bekzod").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance/bulk")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({
            "group_id": group.id,
            "date": "2026-03-03",
            "records": [
                { "student_id": first.id, "status": "present" },
                { "student_id": second.id, "status": "absent" },
                { "student_id": outsider.id, "status": "present" }
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["created"], 2);
    assert_eq!(body["updated"], 0);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(ctx.drain_outbox().len(), 1);
}

#[actix_web::test]
async fn grade_above_maximum_is_rejected() {
    let mut ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let student = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/grades")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({
            "student_id": student.id,
            "group_id": group.id,
            "value": 6.0,
            "grade_type": "exam"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap_or_default().contains("exceeds"));
    assert!(ctx.drain_outbox().is_empty());
}

#[actix_web::test]
async fn grade_is_stored_and_parent_notified() {
    let mut ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let student = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/grades")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({
            "student_id": student.id,
            "group_id": group.id,
            "value": 4.0,
            "grade_type": "homework",
            "title": "Fractions"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let sent = ctx.drain_outbox();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0].kind, NotificationKind::Grade));
    assert!(sent[0].text.contains("Fractions"));

    let req = test::TestRequest::get()
        .uri(&format!("/api/teacher/groups/{}/students", group.id))
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .to_request();
    let roster: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(roster[0]["id"], student.id);
    assert_eq!(roster[0]["average_grade"], 4.0);
}

#[actix_web::test]
async fn empty_bulk_attendance_is_a_bad_request() {
    let ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance/bulk")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "group_id": group.id, "records": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn failed_delivery_does_not_fail_the_write() {
    let mut ctx = setup().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    ctx.notifications = NotificationService::start(Arc::new(Unreachable { attempts: attempts.clone() }));
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let student = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/grades")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "student_id": student.id, "group_id": group.id, "value": 5.0, "grade_type": "test" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/teacher/attendance")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "student_id": student.id, "group_id": group.id, "status": "absent" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // The worker is still draining after the first failure.
    for _ in 0..100 {
        if attempts.load(Ordering::SeqCst) == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[actix_web::test]
async fn grade_date_can_be_corrected() {
    let ctx = setup().await;
    let (teacher_user, teacher) = create_teacher(&ctx.db, 100, "Own").await;
    let parent = create_user(&ctx.db, 300, Role::Parent).await;
    let group = create_group(&ctx.db, teacher.id, "Algebra A").await;
    let student = create_student(&ctx.db, parent.id, group.id, "Timur").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teacher/grades")
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "student_id": student.id, "group_id": group.id, "value": 3.0, "grade_type": "classwork" }))
        .to_request();
    let grade: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/teacher/grades/{}", grade["id"]))
        .insert_header(("Authorization", ctx.bearer(&teacher_user)))
        .set_json(json!({ "date_given": "2026-02-01" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["date_given"], "2026-02-01");
    assert_eq!(body["value"], 3.0);
}
