use rusqlite::{Connection, Result, params};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Embedded schema migrations. The array is kept in lexicographic filename
/// order, which is also the order they are applied in.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_domain.sql",
        include_str!("../migrations/0001_create_domain.sql"),
    ),
    (
        "0002_create_url.sql",
        include_str!("../migrations/0002_create_url.sql"),
    ),
    (
        "0003_create_element.sql",
        include_str!("../migrations/0003_create_element.sql"),
    ),
    (
        "0004_create_request.sql",
        include_str!("../migrations/0004_create_request.sql"),
    ),
];

/// Applies every migration that is not yet recorded in the history table.
/// Each migration runs at most once; re-running the whole set is a no-op.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    create_migration_history(conn)?;

    for (name, sql) in MIGRATIONS {
        if is_applied(conn, name)? {
            continue;
        }
        debug!("Applying migration {}", name);
        conn.execute_batch(sql)?;
        record_migration(conn, name)?;
    }

    Ok(())
}

/// Names of applied migrations, in application order.
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM migration_history ORDER BY name")?;

    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>>>()?;

    Ok(names)
}

fn create_migration_history(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migration_history (
            name TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )
}

fn is_applied(conn: &Connection, name: &str) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM migration_history WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(found != 0)
}

fn record_migration(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO migration_history (name, applied_at) VALUES (?1, ?2)",
        params![name, current_timestamp()],
    )?;
    Ok(())
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
