pub mod admin;
pub mod auth;
pub mod health;
pub mod parent;
pub mod teacher;

use std::str::FromStr;

use actix_web::web;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(admin::admin_routes)
            .configure(teacher::teacher_routes)
            .configure(parent::parent_routes)
    );
}

/// `?skip=&limit=` query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// `(skip, limit)` once checked against `skip >= 0` and `1 <= limit <= 1000`.
    pub fn resolve(&self) -> AppResult<(u64, u64)> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if skip < 0 {
            return Err(AppError::validation("skip must be greater than or equal to 0"));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::validation(format!("limit must be between 1 and {}", MAX_LIMIT)));
        }
        Ok((skip as u64, limit as u64))
    }
}

/// Parses an optional enum parameter such as `?role=` or `"status"`.
pub fn parse_optional<T>(value: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = String>,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<T>().map_err(AppError::Validation))
        .transpose()
}

/// Checks an optional `?limit=` on its own.
pub fn resolve_limit(limit: Option<i64>) -> AppResult<u64> {
    Pagination { skip: None, limit }.resolve().map(|(_, limit)| limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::default().resolve().unwrap(), (0, 100));
    }

    #[test]
    fn test_pagination_bounds() {
        let page = |skip, limit| Pagination { skip: Some(skip), limit: Some(limit) }.resolve();
        assert_eq!(page(20, 1000).unwrap(), (20, 1000));
        assert!(page(-1, 10).is_err());
        assert!(page(0, 0).is_err());
        assert!(page(0, 1001).is_err());
    }

    #[test]
    fn test_parse_optional_role() {
        use crate::models::users::Role;

        assert_eq!(parse_optional::<Role>(Some("Teacher")).unwrap(), Some(Role::Teacher));
        assert_eq!(parse_optional::<Role>(None).unwrap(), None);
        assert!(parse_optional::<Role>(Some("student")).is_err());
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None).unwrap(), 100);
        assert_eq!(resolve_limit(Some(5)).unwrap(), 5);
        assert!(resolve_limit(Some(0)).is_err());
    }
}
