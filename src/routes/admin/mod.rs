// ============================================================================
// ADMIN ROUTES (/api/admin)
// ============================================================================
//
// Every handler takes an `AdminUser`: non-admins get 403 before the body is
// looked at. Admins are unrestricted.
//
//   - users         : list, inspect, edit, block, deactivate, stats
//   - teachers      : profiles, account + profile creation, delete
//   - parents       : parent accounts
//   - students      : enrollment and edits
//   - groups        : CRUD with occupancy
//   - schedules     : weekly slots
//   - payments      : billing, monthly generation, reminders, stats
//   - notifications : direct messages and broadcasts
//
// ============================================================================

pub mod groups;
pub mod notifications;
pub mod parents;
pub mod payments;
pub mod schedules;
pub mod students;
pub mod teachers;
pub mod users;

use actix_web::web;

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .configure(users::user_routes)
            .configure(teachers::teacher_routes)
            .configure(parents::parent_routes)
            .configure(students::student_routes)
            .configure(groups::group_routes)
            .configure(schedules::schedule_routes)
            .configure(payments::payment_routes)
            .configure(notifications::notification_routes)
    );
}
