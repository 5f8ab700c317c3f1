use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{department, employee, schedule, shift_plan, shift_plan_department, shift_type};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    if config.is_sqlite() {
        info!("Opening sqlite database: {}", config.name);
    } else {
        info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);
    }

    let mut opt = ConnectOptions::new(&database_url);
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    if config.is_sqlite() {
        // An in-memory database lives and dies with its single connection
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .set_schema_search_path("public");
    }

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Create missing tables and unique indexes from the entity definitions
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    // Referenced tables first
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(department::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(employee::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(shift_plan::Entity)).await?;
    create_table_if_not_exists(
        db,
        backend,
        schema.create_table_from_entity(shift_plan_department::Entity),
    )
    .await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(shift_type::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(schedule::Entity)).await?;

    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("uq_shift_type_plan_code")
            .table(shift_type::Entity)
            .col(shift_type::Column::ShiftPlanId)
            .col(shift_type::Column::Code)
            .unique()
            .to_owned(),
    )
    .await?;

    // Backs the atomic upsert in handlers::schedule
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("uq_schedule_cell")
            .table(schedule::Entity)
            .col(schedule::Column::EmployeeId)
            .col(schedule::Column::ShiftPlanId)
            .col(schedule::Column::Date)
            .unique()
            .to_owned(),
    )
    .await?;

    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_employee_department")
            .table(employee::Entity)
            .col(employee::Column::DepartmentId)
            .to_owned(),
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Create an index if it doesn't exist
async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
