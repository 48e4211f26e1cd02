// Database module - holdings persistence (SQLite) behind the HoldingsStore trait

pub mod memory;
pub mod models;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub use memory::MemoryHoldingsStore;
pub use models::{normalize_symbol, Holding, MAX_AMOUNT, MIN_COST_VALUE};

/// Durable key-value persistence of holdings, keyed by symbol.
///
/// The ledger only talks to storage through this trait, so it can be
/// exercised without SQLite (see [`MemoryHoldingsStore`]).
pub trait HoldingsStore {
    /// Insert the holding, replacing any existing row for its symbol.
    fn upsert(&mut self, holding: &Holding) -> Result<()>;

    /// Delete the holding for `symbol`. Returns whether a row existed.
    fn delete(&mut self, symbol: &str) -> Result<bool>;

    /// Every stored holding, in a stable order.
    fn list_all(&self) -> Result<Vec<Holding>>;
}

/// Get the default database path (~/.stockfolio/portfolio.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".stockfolio");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&app_dir).context("Failed to create .stockfolio directory")?;

    Ok(app_dir.join("portfolio.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create database directory {:?}", parent))?;
    }

    Connection::open(&path).context(format!("Failed to open database at {:?}", path))
}

/// Run the schema SQL against an open connection
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")
}

/// Initialize the database with schema
///
/// Creates the database file if needed and sets up the holdings table.
pub fn init_database(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    apply_schema(&conn)?;

    debug!("Database initialized successfully");
    Ok(conn)
}

/// SQLite-backed [`HoldingsStore`]
pub struct SqliteHoldingsStore {
    conn: Connection,
}

impl SqliteHoldingsStore {
    /// Open (and initialize if needed) the database at `db_path`, or the
    /// default location when `None`.
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let conn = init_database(db_path)?;
        Ok(Self { conn })
    }

    /// Non-durable store, handy for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl HoldingsStore for SqliteHoldingsStore {
    fn upsert(&mut self, holding: &Holding) -> Result<()> {
        // Symbols match case-insensitively, so rows written by hand in another
        // case are replaced rather than duplicated. Updating in place keeps
        // the rowid, and with it the holding's position.
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM holdings
             WHERE symbol = ?1 COLLATE NOCASE
               AND rowid <> (SELECT MIN(rowid) FROM holdings WHERE symbol = ?1 COLLATE NOCASE)",
            params![holding.symbol],
        )
        .context(format!("Failed to clear duplicates of {}", holding.symbol))?;

        let shares = holding.shares.to_string();
        let cost_basis = holding.cost_basis.to_string();
        let updated = tx
            .execute(
                "UPDATE holdings
                 SET symbol = ?1, shares = ?2, cost_basis = ?3, acquired_on = ?4
                 WHERE symbol = ?1 COLLATE NOCASE",
                params![holding.symbol, shares, cost_basis, holding.acquired_on],
            )
            .context(format!("Failed to update holding {}", holding.symbol))?;
        if updated == 0 {
            tx.execute(
                "INSERT INTO holdings (symbol, shares, cost_basis, acquired_on)
                 VALUES (?1, ?2, ?3, ?4)",
                params![holding.symbol, shares, cost_basis, holding.acquired_on],
            )
            .context(format!("Failed to insert holding {}", holding.symbol))?;
        }
        tx.commit()
            .context(format!("Failed to upsert holding {}", holding.symbol))?;

        debug!("Upserted holding {}", holding.symbol);
        Ok(())
    }

    fn delete(&mut self, symbol: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM holdings WHERE symbol = ?1 COLLATE NOCASE",
                params![symbol],
            )
            .context(format!("Failed to delete holding {}", symbol))?;

        debug!("Deleted {} row(s) for {}", deleted, symbol);
        Ok(deleted > 0)
    }

    fn list_all(&self) -> Result<Vec<Holding>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, shares, cost_basis, acquired_on
             FROM holdings
             ORDER BY rowid ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let symbol: String = row.get(0)?;
                Ok(Holding {
                    symbol: normalize_symbol(&symbol),
                    shares: get_decimal_value(row, 1)?,
                    cost_basis: get_decimal_value(row, 2)?,
                    acquired_on: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read holdings")?;

        // Hand-edited rows may differ only by case; the first one wins
        let mut holdings: Vec<Holding> = Vec::with_capacity(rows.len());
        for holding in rows {
            if holdings.iter().any(|h| h.symbol == holding.symbol) {
                warn!("Ignoring duplicate row for {}", holding.symbol);
            } else {
                holdings.push(holding);
            }
        }

        Ok(holdings)
    }
}

/// Helper to read Decimal from SQLite (handles TEXT, INTEGER and REAL)
fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::{Type, ValueRef};

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;
            Decimal::from_str(s.trim())
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        }
        // INTEGER storage due to SQLite type affinity
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        // REAL values written by hand or by other tools
        ValueRef::Real(f) => Decimal::try_from(f)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Real, Box::new(e))),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            other.data_type(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_init_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let conn = init_database(Some(db_path.clone())).unwrap();
        drop(conn);

        // Verify database exists and has the holdings table
        let conn = Connection::open(&db_path).unwrap();
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='holdings'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 1);
    }

    #[test]
    fn test_upsert_then_list_round_trips_exact_values() {
        let mut store = SqliteHoldingsStore::in_memory().unwrap();
        let holding = Holding::new("BRK.B", dec!(0.333333333333), dec!(412.0799), date(2024, 2, 29));

        store.upsert(&holding).unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed, vec![holding]);
    }

    #[test]
    fn test_upsert_replaces_and_keeps_position() {
        let mut store = SqliteHoldingsStore::in_memory().unwrap();
        store
            .upsert(&Holding::new("AAPL", dec!(10), dec!(150), date(2025, 1, 2)))
            .unwrap();
        store
            .upsert(&Holding::new("MSFT", dec!(5), dec!(300), date(2025, 1, 3)))
            .unwrap();
        store
            .upsert(&Holding::new("AAPL", dec!(4), dec!(170.5), date(2025, 2, 1)))
            .unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].symbol, "AAPL");
        assert_eq!(listed[0].shares, dec!(4));
        assert_eq!(listed[0].cost_basis, dec!(170.5));
        assert_eq!(listed[0].acquired_on, date(2025, 2, 1));
        assert_eq!(listed[1].symbol, "MSFT");
    }

    #[test]
    fn test_delete_reports_whether_row_existed() {
        let mut store = SqliteHoldingsStore::in_memory().unwrap();
        store
            .upsert(&Holding::new("AAPL", dec!(10), dec!(150), date(2025, 1, 2)))
            .unwrap();

        assert!(store.delete("AAPL").unwrap());
        assert!(!store.delete("AAPL").unwrap());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_reads_rows_inserted_as_numeric_literals() {
        let store = SqliteHoldingsStore::in_memory().unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO holdings (symbol, shares, cost_basis, acquired_on)
                 VALUES ('VT', 12, 101.25, '2023-06-30')",
                [],
            )
            .unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed[0].shares, dec!(12));
        assert_eq!(listed[0].cost_basis, dec!(101.25));
        assert_eq!(listed[0].acquired_on, date(2023, 6, 30));
    }

    #[test]
    fn test_holdings_survive_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("portfolio.db");

        {
            let mut store = SqliteHoldingsStore::open(Some(db_path.clone())).unwrap();
            store
                .upsert(&Holding::new("AAPL", dec!(10), dec!(150), date(2025, 1, 2)))
                .unwrap();
        }

        let store = SqliteHoldingsStore::open(Some(db_path)).unwrap();
        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].symbol, "AAPL");
    }

    #[test]
    fn test_symbols_match_regardless_of_stored_case() {
        let mut store = SqliteHoldingsStore::in_memory().unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO holdings (symbol, shares, cost_basis, acquired_on)
                 VALUES ('aapl', '10', '150', '2023-06-30'), ('vt', '1', '100', '2023-06-30')",
                [],
            )
            .unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed[0].symbol, "AAPL");
        assert_eq!(listed[1].symbol, "VT");

        store
            .upsert(&Holding::new("AAPL", dec!(3), dec!(160), date(2025, 1, 2)))
            .unwrap();
        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].symbol, "AAPL");
        assert_eq!(listed[0].shares, dec!(3));

        assert!(store.delete("VT").unwrap());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_case_duplicates_from_older_schema_collapse() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE holdings (
                symbol TEXT PRIMARY KEY NOT NULL,
                shares TEXT NOT NULL,
                cost_basis TEXT NOT NULL,
                acquired_on TEXT NOT NULL
            );
            INSERT INTO holdings VALUES ('msft', '1', '300', '2023-01-01');
            INSERT INTO holdings VALUES ('MSFT', '2', '310', '2023-01-02');",
        )
        .unwrap();
        let mut store = SqliteHoldingsStore::from_connection(conn).unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].shares, dec!(1));

        store
            .upsert(&Holding::new("MSFT", dec!(5), dec!(320), date(2025, 1, 2)))
            .unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM holdings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.list_all().unwrap()[0].shares, dec!(5));
    }
}
