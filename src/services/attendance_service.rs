use chrono::{NaiveDate, Utc};
use sea_orm::*;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::attendance::{self, AttendanceStatus};
use crate::models::students;
use crate::services::access;

pub struct AttendanceService;

#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub student_id: i32,
    pub group_id: i32,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct MarkOutcome {
    pub record: attendance::Model,
    pub student: students::Model,
    pub created: bool,
    /// The record just became `absent`.
    pub newly_absent: bool,
}

impl AttendanceService {
    /// Creates or updates the single record for (student, group, date).
    ///
    /// The caller is responsible for checking the group belongs to the teacher.
    pub async fn mark<C: ConnectionTrait>(db: &C, marked_by: i32, input: MarkAttendance) -> AppResult<MarkOutcome> {
        let student = access::enrolled_student(db, input.student_id, input.group_id).await?;

        let existing = attendance::Entity::find()
            .filter(attendance::Column::StudentId.eq(input.student_id))
            .filter(attendance::Column::GroupId.eq(input.group_id))
            .filter(attendance::Column::Date.eq(input.date))
            .one(db)
            .await?;

        let now = Utc::now();
        let outcome = match existing {
            Some(record) => {
                let was_absent = record.status == AttendanceStatus::Absent;
                let mut active: attendance::ActiveModel = record.into();
                active.status = Set(input.status);
                active.notes = Set(input.notes);
                active.marked_by = Set(marked_by);
                active.updated_at = Set(Some(now));
                let record = active.update(db).await?;
                MarkOutcome {
                    newly_absent: input.status == AttendanceStatus::Absent && !was_absent,
                    record,
                    student,
                    created: false,
                }
            }
            None => {
                let record = attendance::ActiveModel {
                    student_id: Set(input.student_id),
                    group_id: Set(input.group_id),
                    date: Set(input.date),
                    status: Set(input.status),
                    notes: Set(input.notes),
                    marked_by: Set(marked_by),
                    created_at: Set(now),
                    updated_at: Set(None),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                MarkOutcome {
                    newly_absent: input.status == AttendanceStatus::Absent,
                    record,
                    student,
                    created: true,
                }
            }
        };

        Ok(outcome)
    }

    /// Marks every entry inside one transaction. Entries for unknown or
    /// foreign students are skipped; any database failure rolls back the batch.
    pub async fn mark_bulk(
        db: &DatabaseConnection,
        marked_by: i32,
        entries: Vec<MarkAttendance>,
    ) -> AppResult<(Vec<MarkOutcome>, usize)> {
        let txn = db.begin().await?;

        let mut outcomes = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for entry in entries {
            let student_id = entry.student_id;
            match Self::mark(&txn, marked_by, entry).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(AppError::Validation(reason) | AppError::NotFound(reason)) => {
                    warn!(student_id, %reason, "skipping attendance entry");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        txn.commit().await?;
        info!(marked_by, saved = outcomes.len(), skipped, "bulk attendance saved");
        Ok((outcomes, skipped))
    }

    pub async fn for_group(
        db: &DatabaseConnection,
        group_id: i32,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<attendance::Model>, DbErr> {
        let mut query = attendance::Entity::find().filter(attendance::Column::GroupId.eq(group_id));
        if let Some(from) = date_from {
            query = query.filter(attendance::Column::Date.gte(from));
        }
        if let Some(to) = date_to {
            query = query.filter(attendance::Column::Date.lte(to));
        }
        query
            .order_by_desc(attendance::Column::Date)
            .order_by_asc(attendance::Column::StudentId)
            .all(db)
            .await
    }

    pub async fn for_student(
        db: &DatabaseConnection,
        student_id: i32,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        limit: u64,
    ) -> Result<Vec<attendance::Model>, DbErr> {
        let mut query = attendance::Entity::find().filter(attendance::Column::StudentId.eq(student_id));
        if let Some(from) = date_from {
            query = query.filter(attendance::Column::Date.gte(from));
        }
        if let Some(to) = date_to {
            query = query.filter(attendance::Column::Date.lte(to));
        }
        query
            .order_by_desc(attendance::Column::Date)
            .limit(limit)
            .all(db)
            .await
    }
}
