use crate::error::{ConnectionError, Result};
use crate::transform::{Transaction, DATE_FORMAT};
use rusqlite::{params, Connection, ErrorCode};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Content hash used as the dedup key of the relational sink.
/// Derived from date + description + amount only; category changes do not
/// make a transaction new.
pub fn transaction_hash(tx: &Transaction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}{}{}",
        tx.date.format(DATE_FORMAT),
        tx.description,
        tx.amount.normalize()
    ));
    format!("{:x}", hasher.finalize())
}

/// Map a driver error onto the connection failure taxonomy
pub fn classify_connection_error(err: &rusqlite::Error) -> ConnectionError {
    let message = err.to_string();
    let lowered = message.to_lowercase();

    if lowered.contains("certificate") || lowered.contains("ssl") || lowered.contains("tls") {
        return ConnectionError::Certificate(message);
    }

    match err.sqlite_error_code() {
        Some(ErrorCode::PermissionDenied)
        | Some(ErrorCode::AuthorizationForStatementDenied)
        | Some(ErrorCode::NotADatabase) => ConnectionError::Auth(message),
        Some(ErrorCode::CannotOpen) | Some(ErrorCode::SystemIoFailure) => {
            ConnectionError::Network(message)
        }
        _ => ConnectionError::Database(message),
    }
}

/// Outcome of one insert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub inserted: usize,
    pub duplicates: usize,
}

// ============================================================================
// RELATIONAL SINK
// ============================================================================

/// Owns the connection for the whole run; dropping the sink closes it
pub struct DatabaseSink {
    conn: Connection,
}

impl DatabaseSink {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(DatabaseSink { conn })
    }

    /// Insert every transaction; identical ones already stored are skipped
    pub fn insert_transactions(&mut self, transactions: &[Transaction]) -> Result<InsertStats> {
        let mut stats = InsertStats::default();
        let db_tx = self.conn.transaction()?;

        for tx in transactions {
            let hash = transaction_hash(tx);

            let result = db_tx.execute(
                "INSERT INTO ModifiedTransactions (
                    Month, Date, Description, Amount, Category, Subcategory, TransactionHash
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    tx.month,
                    tx.date.format(DATE_FORMAT).to_string(),
                    tx.description,
                    tx.amount.to_string(),
                    tx.category,
                    tx.subcategory,
                    hash,
                ],
            );

            match result {
                Ok(_) => stats.inserted += 1,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    stats.duplicates += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        db_tx.commit()?;
        log::info!(
            "Inserted {} transactions, skipped {} duplicates",
            stats.inserted,
            stats.duplicates
        );
        Ok(stats)
    }

    pub fn count(&self) -> Result<i64> {
        verify_count(&self.conn)
    }

    /// Close explicitly to surface errors that a plain drop would discard
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ModifiedTransactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            Month TEXT NOT NULL,
            Date TEXT NOT NULL,
            Description TEXT NOT NULL,
            Amount TEXT NOT NULL,
            Category TEXT NOT NULL,
            Subcategory TEXT NOT NULL,
            TransactionHash TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM ModifiedTransactions", [], |row| row.get(0))?;

    Ok(count)
}
