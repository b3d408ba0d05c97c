//! Drops the SQL catalog tables so the next server start migrates from scratch.
//! Video files in the data directory are left alone.

use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
use std::env;

#[tokio::main]
async fn main() -> Result<(), sea_orm::DbErr> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| ".".to_string());
        format!("sqlite://{}/catalog.db?mode=rwc", data_dir)
    });

    let db = Database::connect(&database_url).await?;

    for table in ["ratings", "videos", "seaql_migrations"] {
        db.execute(Statement::from_string(
            DbBackend::Sqlite,
            format!("DROP TABLE IF EXISTS \"{}\";", table),
        ))
        .await?;
    }

    println!("Catalog database reset successfully ({})", database_url);
    Ok(())
}
