//! SQLite tables exposed as feed collections.
//!
//! Every user table is a collection. Rows are read through the projection
//! `SELECT rowid AS "rowid", * FROM "<table>"`, so the identity column is
//! always first and every entry can be addressed by its rowid.

use std::fmt;
use std::str::Utf8Error;

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Statement};
use thiserror::Error;

use crate::cell::{CellValue, EdmType, ROWID_COLUMN};
use crate::row::{ColumnDescriptor, Columns, Row};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Errors raised while reading a collection from SQLite.
#[derive(Debug, Error)]
pub enum SqliteSourceError {
    /// No user table carries the requested name.
    #[error("collection {table:?} does not exist")]
    UnknownTable {
        /// Requested collection name.
        table: String,
    },
    /// Enumerating or looking up tables failed.
    #[error("failed to read the table catalogue")]
    Catalogue {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Reading the declared column types failed.
    #[error("failed to reflect the columns of {table:?}")]
    Reflect {
        /// Collection being reflected.
        table: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Counting the rows of a collection failed.
    #[error("failed to count the rows of {table:?}")]
    Count {
        /// Collection being counted.
        table: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Preparing or starting the page query failed.
    #[error("failed to query {table:?}")]
    Query {
        /// Collection being queried.
        table: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Stepping the cursor failed.
    #[error("failed to read the next row")]
    Step {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A value could not be read from the current row.
    #[error("failed to read column {column:?}")]
    Read {
        /// Raw column name.
        column: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The value has no feed representation.
    #[error("column {column:?} holds a BLOB, which cannot be encoded")]
    UnsupportedValue {
        /// Raw column name.
        column: String,
    },
    /// Text storage is not valid UTF-8.
    #[error("column {column:?} holds text that is not valid UTF-8")]
    InvalidText {
        /// Raw column name.
        column: String,
        /// Decoding error.
        #[source]
        source: Utf8Error,
    },
    /// A column declared as a date or timestamp holds unparseable text.
    #[error("column {column:?} holds {value:?}, which is not a valid {expected}")]
    InvalidTemporal {
        /// Raw column name.
        column: String,
        /// Offending text.
        value: String,
        /// Type implied by the declaration.
        expected: EdmType,
        /// Parse error reported by `chrono`.
        #[source]
        source: chrono::ParseError,
    },
}

/// How a column's declared type refines SQLite storage classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredKind {
    Plain,
    Boolean,
    Date,
    DateTime,
}

impl DeclaredKind {
    fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.starts_with("BOOL") {
            Self::Boolean
        } else if upper.starts_with("DATETIME") || upper.starts_with("TIMESTAMP") {
            Self::DateTime
        } else if upper == "DATE" {
            Self::Date
        } else {
            Self::Plain
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    kind: DeclaredKind,
}

/// List the user tables of `connection`, sorted by name.
///
/// # Errors
///
/// Returns [`SqliteSourceError::Catalogue`] when `sqlite_master` cannot be
/// read.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use odata_feed_core::source::list_collections;
///
/// let conn = Connection::open_in_memory().expect("open database");
/// conn.execute_batch("CREATE TABLE tweets (body TEXT); CREATE TABLE authors (name TEXT);")
///     .expect("create tables");
/// assert_eq!(list_collections(&conn).expect("list"), ["authors", "tweets"]);
/// ```
pub fn list_collections(connection: &Connection) -> Result<Vec<String>, SqliteSourceError> {
    let mut statement = connection
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY name",
        )
        .map_err(|source| SqliteSourceError::Catalogue { source })?;
    let names = statement
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|source| SqliteSourceError::Catalogue { source })?;
    names
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| SqliteSourceError::Catalogue { source })
}

/// A table opened as a feed collection.
pub struct SqliteCollection<'conn> {
    connection: &'conn Connection,
    table: String,
    columns: Columns,
    fields: Vec<Field>,
}

impl fmt::Debug for SqliteCollection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCollection")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl<'conn> SqliteCollection<'conn> {
    /// Open `table` as a collection.
    ///
    /// The name is checked against `sqlite_master` before it is used in any
    /// query.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError::UnknownTable`] when no user table has
    /// that name, and [`SqliteSourceError::Reflect`] when its columns cannot
    /// be read (for example a `WITHOUT ROWID` table).
    pub fn open(connection: &'conn Connection, table: &str) -> Result<Self, SqliteSourceError> {
        ensure_table(connection, table)?;
        let declared = declared_types(connection, table)?;
        let sql = projection(table);
        let statement = connection
            .prepare(&sql)
            .map_err(|source| SqliteSourceError::Reflect {
                table: table.to_owned(),
                source,
            })?;
        let fields: Vec<Field> = statement
            .column_names()
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let kind = if index == 0 {
                    DeclaredKind::Plain
                } else {
                    declared
                        .iter()
                        .find(|(column, _)| column == name)
                        .map_or(DeclaredKind::Plain, |(_, declared)| {
                            DeclaredKind::from_declared(declared)
                        })
                };
                Field {
                    name: name.to_owned(),
                    kind,
                }
            })
            .collect();
        let columns = fields
            .iter()
            .map(|field| ColumnDescriptor::new(field.name.as_str()))
            .collect();
        debug!("opened collection {table} with {} columns", fields.len());
        Ok(Self {
            connection,
            table: table.to_owned(),
            columns,
            fields,
        })
    }

    /// Name of the underlying table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns of every row, identity column first.
    #[must_use]
    pub const fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Number of rows in the collection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError::Count`] when the query fails.
    pub fn count(&self) -> Result<u64, SqliteSourceError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table));
        let count: i64 = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|source| SqliteSourceError::Count {
                table: self.table.clone(),
                source,
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Prepare the page starting at `offset` holding at most `limit` rows,
    /// in rowid order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError::Query`] when the statement cannot be
    /// prepared.
    pub fn page(&self, offset: u64, limit: u64) -> Result<PageStatement<'conn>, SqliteSourceError> {
        let sql = format!(
            "{} ORDER BY \"rowid\" LIMIT ?1 OFFSET ?2",
            projection(&self.table)
        );
        let statement = self
            .connection
            .prepare(&sql)
            .map_err(|source| SqliteSourceError::Query {
                table: self.table.clone(),
                source,
            })?;
        Ok(PageStatement {
            table: self.table.clone(),
            statement,
            fields: self.fields.clone(),
            limit: saturating_sql_int(limit),
            offset: saturating_sql_int(offset),
        })
    }
}

/// Prepared page query; call [`PageStatement::rows`] to start the cursor.
pub struct PageStatement<'conn> {
    table: String,
    statement: Statement<'conn>,
    fields: Vec<Field>,
    limit: i64,
    offset: i64,
}

impl fmt::Debug for PageStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStatement")
            .field("table", &self.table)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl PageStatement<'_> {
    /// Execute the query and return a lazy cursor over its rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError::Query`] when the query cannot start.
    pub fn rows(&mut self) -> Result<SqliteRows<'_>, SqliteSourceError> {
        let Self {
            table,
            statement,
            fields,
            limit,
            offset,
        } = self;
        let rows = statement
            .query([*limit, *offset])
            .map_err(|source| SqliteSourceError::Query {
                table: table.clone(),
                source,
            })?;
        Ok(SqliteRows {
            rows,
            fields: fields.as_slice(),
        })
    }
}

/// Forward-only cursor converting SQLite rows into feed rows.
pub struct SqliteRows<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    fields: &'stmt [Field],
}

impl fmt::Debug for SqliteRows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRows")
            .field("columns", &self.fields.len())
            .finish_non_exhaustive()
    }
}

impl Iterator for SqliteRows<'_> {
    type Item = Result<Row, SqliteSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Ok(Some(row)) => Some(convert_row(row, self.fields)),
            Ok(None) => None,
            Err(source) => Some(Err(SqliteSourceError::Step { source })),
        }
    }
}

fn ensure_table(connection: &Connection, table: &str) -> Result<(), SqliteSourceError> {
    let found = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()
        .map_err(|source| SqliteSourceError::Catalogue { source })?;
    found.ok_or_else(|| SqliteSourceError::UnknownTable {
        table: table.to_owned(),
    })
}

fn declared_types(
    connection: &Connection,
    table: &str,
) -> Result<Vec<(String, String)>, SqliteSourceError> {
    let reflect = |source| SqliteSourceError::Reflect {
        table: table.to_owned(),
        source,
    };
    let mut statement = connection
        .prepare("SELECT name, type FROM pragma_table_info(?1)")
        .map_err(reflect)?;
    let columns = statement
        .query_map([table], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(reflect)?;
    columns.collect::<Result<Vec<_>, _>>().map_err(reflect)
}

fn projection(table: &str) -> String {
    format!(
        "SELECT rowid AS \"{ROWID_COLUMN}\", * FROM {}",
        quote_identifier(table)
    )
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn saturating_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn convert_row(row: &rusqlite::Row<'_>, fields: &[Field]) -> Result<Row, SqliteSourceError> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let value = row
                .get_ref(index)
                .map_err(|source| SqliteSourceError::Read {
                    column: field.name.clone(),
                    source,
                })?;
            convert_value(field, value)
        })
        .collect()
}

fn convert_value(field: &Field, value: ValueRef<'_>) -> Result<CellValue, SqliteSourceError> {
    match value {
        ValueRef::Null => Ok(CellValue::Null),
        ValueRef::Integer(int) if field.kind == DeclaredKind::Boolean => {
            Ok(CellValue::Boolean(int != 0))
        }
        ValueRef::Integer(int) => Ok(CellValue::Int64(int)),
        ValueRef::Real(real) => Ok(CellValue::Double(real)),
        ValueRef::Text(bytes) => {
            let text =
                std::str::from_utf8(bytes).map_err(|source| SqliteSourceError::InvalidText {
                    column: field.name.clone(),
                    source,
                })?;
            convert_text(field, text)
        }
        ValueRef::Blob(_) => Err(SqliteSourceError::UnsupportedValue {
            column: field.name.clone(),
        }),
    }
}

fn convert_text(field: &Field, text: &str) -> Result<CellValue, SqliteSourceError> {
    let invalid = |expected, source| SqliteSourceError::InvalidTemporal {
        column: field.name.clone(),
        value: text.to_owned(),
        expected,
        source,
    };
    match field.kind {
        DeclaredKind::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(CellValue::Date)
            .map_err(|source| invalid(EdmType::Date, source)),
        DeclaredKind::DateTime => parse_datetime(text)
            .map(CellValue::DateTime)
            .map_err(|source| invalid(EdmType::DateTimeOffset, source)),
        DeclaredKind::Plain | DeclaredKind::Boolean => Ok(CellValue::String(text.to_owned())),
    }
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let local = text.strip_suffix('Z').unwrap_or(text);
    let [spaced, iso] = DATETIME_FORMATS;
    NaiveDateTime::parse_from_str(local, spaced)
        .or_else(|_| NaiveDateTime::parse_from_str(local, iso))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn connection() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory database");
        conn.execute_batch(
            "CREATE TABLE \"Tweet log\" (
                 body TEXT,
                 favourite BOOLEAN,
                 retweets INTEGER,
                 score REAL,
                 posted DATETIME,
                 day DATE
             );
             INSERT INTO \"Tweet log\" VALUES
                 ('first & best', 1, 3, 0.5, '2024-01-19 12:34:56', '2024-01-19'),
                 (NULL, 0, NULL, NULL, '2024-01-20T08:00:00.25Z', NULL),
                 ('third', NULL, 7, 2.0, NULL, '2024-01-21');",
        )
        .expect("seed table");
        conn
    }

    fn read_page(
        collection: &SqliteCollection<'_>,
        offset: u64,
        limit: u64,
    ) -> Vec<Result<Row, SqliteSourceError>> {
        let mut page = collection.page(offset, limit).expect("prepare page");
        page.rows().expect("start cursor").collect()
    }

    #[rstest]
    #[case("BOOLEAN", DeclaredKind::Boolean)]
    #[case("bool", DeclaredKind::Boolean)]
    #[case("DATE", DeclaredKind::Date)]
    #[case(" datetime ", DeclaredKind::DateTime)]
    #[case("TIMESTAMP", DeclaredKind::DateTime)]
    #[case("DATE_TEXT", DeclaredKind::Plain)]
    #[case("", DeclaredKind::Plain)]
    #[case("VARCHAR(20)", DeclaredKind::Plain)]
    fn declared_types_refine_storage(#[case] declared: &str, #[case] expected: DeclaredKind) {
        assert_eq!(DeclaredKind::from_declared(declared), expected);
    }

    #[rstest]
    fn identity_column_comes_first(connection: Connection) {
        let collection = SqliteCollection::open(&connection, "Tweet log").expect("open table");
        let names: Vec<_> = collection.columns().iter().map(ColumnDescriptor::name).collect();
        assert_eq!(
            names,
            ["rowid", "body", "favourite", "retweets", "score", "posted", "day"]
        );
        assert_eq!(collection.columns().rowid_index(), Some(0));
    }

    #[rstest]
    fn counts_rows(connection: Connection) {
        let collection = SqliteCollection::open(&connection, "Tweet log").expect("open table");
        assert_eq!(collection.count().expect("count rows"), 3);
    }

    #[rstest]
    fn converts_values_by_declared_type(connection: Connection) {
        let collection = SqliteCollection::open(&connection, "Tweet log").expect("open table");
        let rows: Vec<Row> = read_page(&collection, 0, 10)
            .into_iter()
            .collect::<Result<_, _>>()
            .expect("read rows");

        let posted = NaiveDate::from_ymd_opt(2024, 1, 19)
            .and_then(|date| date.and_hms_opt(12, 34, 56))
            .expect("valid timestamp");
        let day = NaiveDate::from_ymd_opt(2024, 1, 19).expect("valid date");
        assert_eq!(
            rows.first().map(Row::values),
            Some(
                &[
                    CellValue::Int64(1),
                    CellValue::from("first & best"),
                    CellValue::Boolean(true),
                    CellValue::Int64(3),
                    CellValue::Double(0.5),
                    CellValue::DateTime(posted),
                    CellValue::Date(day),
                ][..]
            )
        );

        let second = rows.get(1).expect("second row");
        assert_eq!(second.get(1), Some(&CellValue::Null));
        assert_eq!(second.get(2), Some(&CellValue::Boolean(false)));
        assert!(matches!(second.get(5), Some(CellValue::DateTime(_))));
    }

    #[rstest]
    #[case(0, 2, &[1, 2])]
    #[case(1, 10, &[2, 3])]
    #[case(3, 10, &[])]
    #[case(0, 0, &[])]
    fn pages_are_rowid_slices(
        connection: Connection,
        #[case] offset: u64,
        #[case] limit: u64,
        #[case] expected: &[i64],
    ) {
        let collection = SqliteCollection::open(&connection, "Tweet log").expect("open table");
        let rowids: Vec<_> = read_page(&collection, offset, limit)
            .into_iter()
            .map(|row| row.expect("read row").get(0).cloned())
            .collect();
        let expected: Vec<_> = expected
            .iter()
            .map(|&rowid| Some(CellValue::Int64(rowid)))
            .collect();
        assert_eq!(rowids, expected);
    }

    #[rstest]
    fn unknown_tables_are_rejected(connection: Connection) {
        let err = SqliteCollection::open(&connection, "missing\"; DROP TABLE x; --")
            .expect_err("unknown table");
        assert!(matches!(err, SqliteSourceError::UnknownTable { .. }));
    }

    #[rstest]
    fn blobs_are_schema_violations(connection: Connection) {
        connection
            .execute_batch("CREATE TABLE files (data BLOB); INSERT INTO files VALUES (x'00ff');")
            .expect("seed blob");
        let collection = SqliteCollection::open(&connection, "files").expect("open table");
        let rows = read_page(&collection, 0, 10);
        assert!(matches!(
            rows.first(),
            Some(Err(SqliteSourceError::UnsupportedValue { column })) if column == "data"
        ));
    }

    #[rstest]
    fn malformed_dates_are_schema_violations(connection: Connection) {
        connection
            .execute_batch("CREATE TABLE events (at DATE); INSERT INTO events VALUES ('soon');")
            .expect("seed events");
        let collection = SqliteCollection::open(&connection, "events").expect("open table");
        let rows = read_page(&collection, 0, 10);
        assert!(matches!(
            rows.first(),
            Some(Err(SqliteSourceError::InvalidTemporal {
                expected: EdmType::Date,
                ..
            }))
        ));
    }

    #[rstest]
    fn lists_user_tables(connection: Connection) {
        connection
            .execute_batch("CREATE TABLE authors (name TEXT);")
            .expect("create table");
        assert_eq!(
            list_collections(&connection).expect("list collections"),
            ["Tweet log", "authors"]
        );
    }
}
