use crate::Result;
use camino::Utf8Path;
use core::time::Duration;
use ohno::IntoAppError;
use rusqlite::{Connection, OpenFlags};

const LOG_TARGET: &str = "     store";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the database file and apply connection pragmas.
pub fn open(path: &Utf8Path) -> Result<Connection> {
    log::debug!(target: LOG_TARGET, "opening database '{path}'");

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).into_app_err_with(|| format!("opening database '{path}'"))?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

/// A private in-memory database, mostly for tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().into_app_err("opening in-memory database")?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT).into_app_err("setting busy timeout")?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;",
    )
    .into_app_err("applying database pragmas")
}
