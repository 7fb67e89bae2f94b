use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub student_id: i32,
    pub group_id: i32,
    pub value: f64,
    pub max_value: f64,
    pub grade_type: String, // exam, homework, test, quiz, project, presentation...
    pub title: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub date_given: Date,
    pub given_by: i32, // users.id of the teacher
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
    pub fn percentage(&self) -> f64 {
        if self.max_value == 0.0 {
            return 0.0;
        }
        self.value / self.max_value * 100.0
    }

    pub fn letter(&self) -> &'static str {
        letter_for_percentage(self.percentage())
    }
}

pub fn letter_for_percentage(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A"
    } else if percentage >= 80.0 {
        "B"
    } else if percentage >= 70.0 {
        "C"
    } else if percentage >= 60.0 {
        "D"
    } else {
        "F"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_boundaries() {
        assert_eq!(letter_for_percentage(100.0), "A");
        assert_eq!(letter_for_percentage(90.0), "A");
        assert_eq!(letter_for_percentage(89.9), "B");
        assert_eq!(letter_for_percentage(70.0), "C");
        assert_eq!(letter_for_percentage(60.0), "D");
        assert_eq!(letter_for_percentage(59.0), "F");
    }
}
