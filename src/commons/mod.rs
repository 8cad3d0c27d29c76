use anyhow::Context;
use sqlx::any::AnyPoolOptions;
use sqlx::migrate::Migrator;
use sqlx::AnyPool;

static POSTGRES_MIGRATOR: Migrator = sqlx::migrate!("./migrations/postgres");
static SQLITE_MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

pub fn is_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

// An in-memory SQLite database lives and dies with its connection, so the pool
// must hold exactly one and never recycle it.
fn is_sqlite_memory(database_url: &str) -> bool {
    is_sqlite(database_url) && database_url.contains(":memory:")
}

pub async fn connect(database_url: &str, max_connections: u32) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    let options = if is_sqlite_memory(database_url) {
        AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        AnyPoolOptions::new().max_connections(max_connections)
    };

    options.connect(database_url).await
}

pub async fn migrate(db: &AnyPool, database_url: &str) -> anyhow::Result<()> {
    let migrator = if is_sqlite(database_url) {
        &SQLITE_MIGRATOR
    } else {
        &POSTGRES_MIGRATOR
    };

    migrator
        .run(db)
        .await
        .context("failed to run database migrations")?;

    log::info!("[migrate] schema is up to date");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_db() -> AnyPool {
    let url = "sqlite::memory:";
    let db = connect(url, 1).await.expect("in-memory sqlite should connect");
    migrate(&db, url).await.expect("migrations should apply");
    db
}
