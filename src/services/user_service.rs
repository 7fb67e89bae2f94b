use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::UserStats;
use crate::models::teachers;
use crate::models::users::{self, Role};
use crate::utils::telegram::TelegramUser;

pub struct UserService;

/// Fields of a user created by an admin (parents and teacher accounts).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
}

/// Teacher profile fields, shared by `POST /teachers` and `POST /teachers/with-user`.
#[derive(Debug, Clone)]
pub struct TeacherProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: i32,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_blocked: Option<bool>,
}

impl UserService {
    pub async fn find_by_telegram_id<C: ConnectionTrait>(
        db: &C,
        telegram_id: i64,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::TelegramId.eq(telegram_id))
            .one(db)
            .await
    }

    /// Returns the user behind a verified Telegram identity, creating a
    /// `parent` account on first contact (the flag is `true` then). Profile
    /// fields are refreshed when Telegram reports new values.
    pub async fn find_or_create_from_telegram(
        db: &DatabaseConnection,
        tg_user: &TelegramUser,
    ) -> AppResult<(users::Model, bool)> {
        let full_name = tg_user.full_name();

        if let Some(existing) = Self::find_by_telegram_id(db, tg_user.id).await? {
            let changed = (tg_user.username.is_some() && existing.username != tg_user.username)
                || (full_name.is_some() && existing.full_name != full_name);
            if !changed {
                return Ok((existing, false));
            }

            let mut active: users::ActiveModel = existing.into();
            if tg_user.username.is_some() {
                active.username = Set(tg_user.username.clone());
            }
            if full_name.is_some() {
                active.full_name = Set(full_name);
            }
            active.updated_at = Set(Some(Utc::now()));
            return Ok((active.update(db).await?, false));
        }

        let user = Self::insert_user(
            db,
            NewUser {
                telegram_id: tg_user.id,
                username: tg_user.username.clone(),
                full_name,
                role: Role::Parent,
            },
        )
        .await?;
        info!(user_id = user.id, telegram_id = user.telegram_id, "registered new user from Telegram");
        Ok((user, true))
    }

    /// Inserts a user after checking the Telegram id is free.
    pub async fn create_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> AppResult<users::Model> {
        if Self::find_by_telegram_id(db, new_user.telegram_id).await?.is_some() {
            return Err(AppError::conflict(format!(
                "User with telegram_id {} already exists",
                new_user.telegram_id
            )));
        }
        Self::insert_user(db, new_user).await
    }

    async fn insert_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> AppResult<users::Model> {
        let user = users::ActiveModel {
            telegram_id: Set(new_user.telegram_id),
            username: Set(new_user.username),
            full_name: Set(new_user.full_name),
            role: Set(new_user.role),
            is_active: Set(true),
            is_blocked: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        };
        Ok(user.insert(db).await?)
    }

    pub async fn get(db: &DatabaseConnection, user_id: i32) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn list(
        db: &DatabaseConnection,
        role: Option<Role>,
        is_active: Option<bool>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<users::Model>, DbErr> {
        let mut query = users::Entity::find();
        if let Some(role) = role {
            query = query.filter(users::Column::Role.eq(role));
        }
        if let Some(is_active) = is_active {
            query = query.filter(users::Column::IsActive.eq(is_active));
        }
        query
            .order_by_asc(users::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn update(db: &DatabaseConnection, user_id: i32, changes: UserChanges) -> AppResult<users::Model> {
        let user = Self::get(db, user_id).await?;
        let mut active: users::ActiveModel = user.into();

        if changes.username.is_some() {
            active.username = Set(changes.username);
        }
        if changes.full_name.is_some() {
            active.full_name = Set(changes.full_name);
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_blocked) = changes.is_blocked {
            active.is_blocked = Set(is_blocked);
        }
        active.updated_at = Set(Some(Utc::now()));

        let user = active.update(db).await?;
        info!(user_id, "user updated");
        Ok(user)
    }

    /// Active, unblocked users, optionally of one role. Broadcast recipients.
    pub async fn reachable(db: &DatabaseConnection, role: Option<Role>) -> Result<Vec<users::Model>, DbErr> {
        let mut query = users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .filter(users::Column::IsBlocked.eq(false));
        if let Some(role) = role {
            query = query.filter(users::Column::Role.eq(role));
        }
        query.all(db).await
    }

    pub async fn set_blocked(db: &DatabaseConnection, user_id: i32, blocked: bool) -> AppResult<users::Model> {
        let user = Self::get(db, user_id).await?;
        let mut active: users::ActiveModel = user.into();
        active.is_blocked = Set(blocked);
        active.updated_at = Set(Some(Utc::now()));
        let user = active.update(db).await?;
        info!(user_id, blocked, "user block flag changed");
        Ok(user)
    }

    /// Users are never removed through the API; deleting one deactivates it.
    pub async fn deactivate(db: &DatabaseConnection, user_id: i32) -> AppResult<users::Model> {
        let user = Self::get(db, user_id).await?;
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let user = active.update(db).await?;
        info!(user_id, "user deactivated");
        Ok(user)
    }

    pub async fn stats(db: &DatabaseConnection) -> AppResult<UserStats> {
        let count_where = |condition: Condition| {
            users::Entity::find().filter(condition).count(db)
        };

        Ok(UserStats {
            total_users: users::Entity::find().count(db).await?,
            active_users: count_where(Condition::all().add(users::Column::IsActive.eq(true))).await?,
            blocked_users: count_where(Condition::all().add(users::Column::IsBlocked.eq(true))).await?,
            admins_count: count_where(Condition::all().add(users::Column::Role.eq(Role::Admin))).await?,
            teachers_count: count_where(Condition::all().add(users::Column::Role.eq(Role::Teacher))).await?,
            parents_count: count_where(Condition::all().add(users::Column::Role.eq(Role::Parent))).await?,
        })
    }

    /// Attaches a teacher profile to an existing teacher-role user.
    pub async fn create_teacher_profile<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        profile: TeacherProfile,
    ) -> AppResult<teachers::Model> {
        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if user.role != Role::Teacher {
            return Err(AppError::validation("User must have the teacher role"));
        }

        let existing = teachers::Entity::find()
            .filter(teachers::Column::UserId.eq(user_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::conflict("Teacher profile already exists for this user"));
        }

        let now = Utc::now();
        let teacher = teachers::ActiveModel {
            user_id: Set(user_id),
            first_name: Set(profile.first_name),
            last_name: Set(profile.last_name),
            phone: Set(profile.phone),
            email: Set(profile.email),
            specialization: Set(profile.specialization),
            experience_years: Set(profile.experience_years),
            bio: Set(profile.bio),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        };
        Ok(teacher.insert(db).await?)
    }

    /// Creates the teacher account and its profile atomically.
    pub async fn create_teacher_with_user(
        db: &DatabaseConnection,
        new_user: NewUser,
        profile: TeacherProfile,
    ) -> AppResult<(users::Model, teachers::Model)> {
        let txn = db.begin().await?;

        let user = Self::create_user(&txn, NewUser { role: Role::Teacher, ..new_user }).await?;
        let teacher = Self::create_teacher_profile(&txn, user.id, profile).await?;

        txn.commit().await?;
        info!(user_id = user.id, teacher_id = teacher.id, "teacher account created");
        Ok((user, teacher))
    }
}
