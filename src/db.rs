// Database connection and schema bootstrap

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::models::{attendance, grades, groups, payments, schedules, students, teachers, users};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Creates every table (and the composite unique indexes) that does not exist yet.
///
/// Tables are created parent-first so foreign keys always point at an existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, teachers::Entity).await?;
    create_table(db, groups::Entity).await?;
    create_table(db, students::Entity).await?;
    create_table(db, schedules::Entity).await?;
    create_table(db, attendance::Entity).await?;
    create_table(db, grades::Entity).await?;
    create_table(db, payments::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("uq_attendance_student_group_date")
            .table(attendance::Entity)
            .col(attendance::Column::StudentId)
            .col(attendance::Column::GroupId)
            .col(attendance::Column::Date)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("uq_payments_student_month_year")
            .table(payments::Entity)
            .col(payments::Column::StudentId)
            .col(payments::Column::Month)
            .col(payments::Column::Year)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    info!("Database schema is up to date");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, statement: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
