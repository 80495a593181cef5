use crate::adapter::{ensure_safe_identifier, DatabaseAdapter};
use crate::error::Result;
use crate::types::{ColumnIntrospection, ColumnMetadata, TableIntrospection};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Introspects a SQLite database. SQLite has no schemas, so the schema argument is ignored.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open an existing database read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl DatabaseAdapter for SqliteCatalog {
    fn introspect_table(&self, table: &str, _schema: Option<&str>) -> Result<TableIntrospection> {
        let table = ensure_safe_identifier(table)?;
        if !self.table_exists(table)? {
            log::debug!("SQLite table '{}' not found", table);
            return Ok(TableIntrospection::missing(table, None));
        }
        let row_count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                    row.get(0)
                })?;
        Ok(TableIntrospection::found(
            table,
            None,
            u64::try_from(row_count).ok(),
        ))
    }

    fn introspect_columns(&self, table: &str, _schema: Option<&str>) -> Result<ColumnIntrospection> {
        let table = ensure_safe_identifier(table)?;
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
        let columns = stmt
            .query_map([], |row| {
                let not_null: i64 = row.get(3)?;
                let primary_key: i64 = row.get(5)?;
                Ok(ColumnMetadata {
                    name: row.get(1)?,
                    data_type: row.get(2)?,
                    nullable: not_null == 0 && primary_key == 0,
                    default: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ColumnIntrospection::from_columns(table, None, columns))
    }
}
