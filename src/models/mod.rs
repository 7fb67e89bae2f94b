// ============================================================================
// MODELS
// ============================================================================
//
// One sea-orm entity per table. Ownership is always a foreign-key parent:
//   - users      : Telegram identity, role, active/blocked flags
//   - teachers   : profile of a teacher-role user (CASCADE from users)
//   - groups     : course offering owned by a teacher (RESTRICT on teacher)
//   - students   : child of a parent user, enrolled in one group
//   - attendance : one row per (student, group, date)
//   - grades     : value over max_value, given by a teacher
//   - payments   : one row per (student, month, year), due-date driven
//   - schedules  : recurring weekly slot for a group/teacher pair
//   - dto        : response shapes that are not a single table row
//   - health     : health check payload
//
// ============================================================================

pub mod health;
pub mod dto;
pub mod users;
pub mod teachers;
pub mod groups;
pub mod students;
pub mod attendance;
pub mod grades;
pub mod payments;
pub mod schedules;
