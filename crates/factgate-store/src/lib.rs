//! Factgate Storage Layer
//!
//! Implements the `FactStore` and `CooldownLedger` traits on SQLite.
//!
//! # Tables
//!
//! - `facts`: accepted statements, `id` assigned by `AUTOINCREMENT`
//! - `rate_limited_addresses`: one `retry_at` per wallet address
//!
//! Addresses are stored in their lowercase `0x` form so grouping and lookups
//! are case-insensitive with respect to the submitted text.
//!
//! # Examples
//!
//! ```no_run
//! use factgate_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for fact and cooldown operations
//! ```

#![warn(missing_docs)]

use factgate_domain::traits::{CooldownLedger, FactStore};
use factgate_domain::{Address, FactRecord, LeaderboardEntry, RecordId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-based implementation of FactStore and CooldownLedger
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store across tasks behind
/// a mutex, or give each thread its own `SqliteStore`.
pub struct SqliteStore {
    conn: Connection,
}

const FACT_COLUMNS: &str = "id, wallet_address, statement, accepted_at";

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Parse a stored address column
    fn address_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Address> {
        let text: String = row.get(index)?;
        Address::parse(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(StoreError::InvalidData(e)),
            )
        })
    }

    /// Map a row selected with `FACT_COLUMNS`
    fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<FactRecord> {
        Ok(FactRecord {
            id: RecordId::from_value(row.get::<_, i64>(0)? as u64),
            identity: Self::address_column(row, 1)?,
            statement: row.get(2)?,
            accepted_at: row.get::<_, i64>(3)? as u64,
        })
    }

    fn query_facts(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<FactRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let facts = stmt
            .query_map(params, Self::fact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(facts)
    }
}

impl FactStore for SqliteStore {
    type Error = StoreError;

    fn list_all(&self) -> Result<Vec<FactRecord>, Self::Error> {
        self.query_facts(
            &format!("SELECT {} FROM facts ORDER BY id ASC", FACT_COLUMNS),
            &[],
        )
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<FactRecord>, Self::Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_facts(
            &format!(
                "SELECT {cols} FROM (SELECT {cols} FROM facts ORDER BY id DESC LIMIT ?1) ORDER BY id ASC",
                cols = FACT_COLUMNS
            ),
            &[&limit],
        )
    }

    fn get_fact(&self, id: RecordId) -> Result<Option<FactRecord>, Self::Error> {
        let id = i64::try_from(id.value())
            .map_err(|_| StoreError::InvalidData(format!("Record id out of range: {}", id)))?;

        let fact = self
            .conn
            .query_row(
                &format!("SELECT {} FROM facts WHERE id = ?1", FACT_COLUMNS),
                params![id],
                Self::fact_from_row,
            )
            .optional()?;

        Ok(fact)
    }

    fn append(
        &mut self,
        identity: Address,
        statement: &str,
        accepted_at: u64,
    ) -> Result<FactRecord, Self::Error> {
        self.conn.execute(
            "INSERT INTO facts (wallet_address, statement, accepted_at) VALUES (?1, ?2, ?3)",
            params![identity.to_string(), statement, accepted_at as i64],
        )?;

        Ok(FactRecord {
            id: RecordId::from_value(self.conn.last_insert_rowid() as u64),
            identity,
            statement: statement.to_string(),
            accepted_at,
        })
    }

    fn count(&self) -> Result<u64, Self::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT wallet_address, COUNT(id) AS row_count, SUM(id) AS id_sum
             FROM facts
             GROUP BY wallet_address
             ORDER BY id_sum DESC, wallet_address ASC",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(LeaderboardEntry {
                    identity: Self::address_column(row, 0)?,
                    fact_count: row.get::<_, i64>(1)? as u64,
                    id_sum: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

impl CooldownLedger for SqliteStore {
    type Error = StoreError;

    fn get_retry_after(&self, identity: &Address) -> Result<Option<u64>, Self::Error> {
        let retry_at: Option<i64> = self
            .conn
            .query_row(
                "SELECT retry_at FROM rate_limited_addresses WHERE wallet_address = ?1",
                params![identity.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(retry_at.map(|t| t as u64))
    }

    fn upsert_retry_after(&mut self, identity: Address, retry_after: u64) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO rate_limited_addresses (wallet_address, retry_at) VALUES (?1, ?2)
             ON CONFLICT(wallet_address) DO UPDATE SET retry_at = excluded.retry_at",
            params![identity.to_string(), retry_after as i64],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::new(":memory:").unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.leaderboard().unwrap().is_empty());
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let first = store.append(addr(1), "first", 10).unwrap();
        let second = store.append(addr(2), "second", 20).unwrap();

        assert_eq!(first.id.value(), 1);
        assert_eq!(second.id.value(), 2);
    }

    #[test]
    fn test_bad_stored_address_is_invalid_data() {
        let store = SqliteStore::new(":memory:").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO facts (wallet_address, statement, accepted_at) VALUES ('nope', 's', 0)",
                [],
            )
            .unwrap();

        assert!(store.list_all().is_err());
    }
}
