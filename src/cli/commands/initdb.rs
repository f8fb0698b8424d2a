use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, error, info, trace};

/// Applies every pending migration on an open connection.
pub(crate) async fn apply_migrations(db: &DatabaseConnection) -> Result<()> {
    info!("Running database migrations");
    match Migrator::up(db, None).await {
        Ok(()) => {
            info!("Database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            Err(e.into())
        }
    }
}

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    apply_migrations(&db).await?;
    info!("Database initialization completed successfully!");
    Ok(())
}
