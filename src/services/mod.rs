pub mod access;
pub mod attendance_service;
pub mod grade_service;
pub mod group_service;
pub mod notification_service;
pub mod payment_service;
pub mod schedule_service;
pub mod stats_service;
pub mod student_service;
pub mod teacher_service;
pub mod telegram_notifier;
pub mod user_service;
