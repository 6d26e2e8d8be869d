use rusqlite::types::ValueRef;
use rusqlite::{Params, Statement};

use crate::Result;

/// A single value in a materialized result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Cell {
    /// Text form of the cell, as the MySQL text protocol would render it.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Integer(i) => i.to_string(),
            Cell::Real(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            // Clients rely on NULL arriving as an empty byte string
            ValueRef::Null => Cell::Bytes(Vec::new()),
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Bytes(b.to_vec()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Column names plus fully materialized rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Rows are destined for the binary (prepared statement) protocol.
    pub binary: bool,
}

/// Outcome of a command as handed back to the protocol layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub status: u16,
    pub insert_id: u64,
    pub affected_rows: u64,
    pub result_set: Option<ResultSet>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a statement that does not return rows.
    pub fn exec(insert_id: i64, affected_rows: usize) -> Self {
        QueryResult {
            insert_id: insert_id.max(0) as u64,
            affected_rows: affected_rows as u64,
            ..Self::default()
        }
    }

    /// Build a result set from literal values, one row per entry.
    pub fn simple(columns: &[&str], rows: Vec<Vec<Cell>>, binary: bool) -> Self {
        let affected_rows = rows.len() as u64;
        QueryResult {
            affected_rows,
            result_set: Some(ResultSet {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
                binary,
            }),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        self.result_set.as_ref().map(|rs| rs.rows.as_slice()).unwrap_or(&[])
    }

    pub fn columns(&self) -> &[String] {
        self.result_set.as_ref().map(|rs| rs.columns.as_slice()).unwrap_or(&[])
    }
}

pub struct ResultBuilder;

impl ResultBuilder {
    /// Run a row-returning statement and materialize every row.
    pub fn query<P: Params>(stmt: &mut Statement<'_>, params: P, binary: bool) -> Result<QueryResult> {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut rows = stmt.query(params)?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                record.push(Cell::from(row.get_ref(i)?));
            }
            values.push(record);
        }

        let affected_rows = values.len() as u64;
        Ok(QueryResult {
            affected_rows,
            result_set: Some(ResultSet {
                columns,
                rows: values,
                binary,
            }),
            ..QueryResult::default()
        })
    }
}
