use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::warn;

/// Open a connection for a single logical operation group.
///
/// Connections are not pooled across calls: the pool is capped at one
/// physical connection and the caller closes it when the operation group is
/// done. The connect timeout keeps a dead host from blocking a settings-save
/// indefinitely.
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(1)
        .min_connections(0)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(true);

    Database::connect(opt).await
}

/// Close a connection, logging instead of failing: cleanup runs on both
/// success and error paths and must not mask the primary result.
pub async fn close_connection(db: DatabaseConnection) {
    if let Err(err) = db.close().await {
        warn!("error closing database connection: {err}");
    }
}
