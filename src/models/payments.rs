use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

impl PaymentStatus {
    /// Status as seen by readers: anything not paid becomes overdue once the due date has passed.
    pub fn effective(self, due_date: Option<Date>, today: Date) -> PaymentStatus {
        match (self, due_date) {
            (PaymentStatus::Paid, _) => PaymentStatus::Paid,
            (_, Some(due)) if due < today => PaymentStatus::Overdue,
            (status, _) => status,
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(PaymentStatus::Paid),
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "overdue" => Ok(PaymentStatus::Overdue),
            other => Err(format!(
                "Invalid payment status '{}'. Must be one of: paid, unpaid, overdue",
                other
            )),
        }
    }
}

/// One row per (student, month, year).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub student_id: i32,
    pub group_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub month: i32, // 1-12
    pub year: i32,
    pub status: PaymentStatus,
    pub payment_date: Option<DateTimeUtc>,
    pub due_date: Option<Date>,
    pub notes: Option<String>,
    pub processed_by: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id",
        on_delete = "Cascade"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_delete = "Restrict"
    )]
    Group,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn effective_status(&self, today: Date) -> PaymentStatus {
        self.status.effective(self.due_date, today)
    }
}
