use msql_srv::{
    Column, ColumnFlags, ColumnType, ErrorKind, InitWriter, MysqlShim, ParamParser, QueryResultWriter,
    StatementMetaWriter, ValueInner,
};
use rusqlite::types::Value;
use std::io;
use tracing::warn;

use crate::MySqliteError;
use crate::query::{Cell, QueryResult, ResultSet};
use crate::session::{Session, SessionHandler};

/// Adapts one client's `Session` to the MySQL server protocol.
///
/// The session is torn down when the backend is dropped, which happens
/// when the client disconnects.
///
/// msql-srv drops the database named in the handshake and does not
/// advertise `CLIENT_CONNECT_WITH_DB`, so a database is only bound through
/// COM_INIT_DB (`USE <db>`, or a client's init-db after connecting).
pub struct MysqlBackend {
    session: Session,
}

impl MysqlBackend {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl<W: io::Read + io::Write> MysqlShim<W> for MysqlBackend {
    type Error = io::Error;

    fn on_prepare(&mut self, query: &str, info: StatementMetaWriter<W>) -> io::Result<()> {
        match self.session.on_prepare(query) {
            Ok(prepared) => {
                let params = placeholder_columns(prepared.param_count);
                let columns = placeholder_columns(prepared.column_count);
                info.reply(prepared.handle_id, &params, &columns)
            }
            Err(e) => info.error(error_kind(&e), e.to_string().as_bytes()),
        }
    }

    fn on_execute(&mut self, id: u32, params: ParamParser, results: QueryResultWriter<W>) -> io::Result<()> {
        let args: Vec<Value> = params
            .into_iter()
            .map(|param| param_value(param.value.into_inner()))
            .collect();
        match self.session.on_execute(id, &args) {
            Ok(result) => write_result(result, results),
            Err(e) => results.error(error_kind(&e), e.to_string().as_bytes()),
        }
    }

    fn on_close(&mut self, id: u32) {
        // COM_STMT_CLOSE has no response packet
        if let Err(e) = self.session.on_close(id) {
            warn!("Close of statement {} failed: {}", id, e);
        }
    }

    fn on_init(&mut self, schema: &str, writer: InitWriter<W>) -> io::Result<()> {
        match self.session.on_select_database(schema) {
            Ok(()) => writer.ok(),
            Err(e) => writer.error(error_kind(&e), e.to_string().as_bytes()),
        }
    }

    fn on_query(&mut self, query: &str, results: QueryResultWriter<W>) -> io::Result<()> {
        match self.session.on_query(query) {
            Ok(result) => write_result(result, results),
            Err(e) => results.error(error_kind(&e), e.to_string().as_bytes()),
        }
    }
}

fn error_kind(error: &MySqliteError) -> ErrorKind {
    match error.mysql_error_code() {
        1235 => ErrorKind::ER_NOT_SUPPORTED_YET,
        1210 => ErrorKind::ER_WRONG_ARGUMENTS,
        1046 => ErrorKind::ER_NO_DB_ERROR,
        1049 => ErrorKind::ER_BAD_DB_ERROR,
        1179 => ErrorKind::ER_CANT_DO_THIS_DURING_AN_TRANSACTION,
        1243 => ErrorKind::ER_UNKNOWN_STMT_HANDLER,
        _ => ErrorKind::ER_UNKNOWN_ERROR,
    }
}

fn placeholder_columns(count: usize) -> Vec<Column> {
    (0..count)
        .map(|_| Column {
            table: String::new(),
            column: "?".to_string(),
            coltype: ColumnType::MYSQL_TYPE_VAR_STRING,
            colflags: ColumnFlags::empty(),
        })
        .collect()
}

fn param_value(value: ValueInner) -> Value {
    match value {
        ValueInner::NULL => Value::Null,
        ValueInner::Int(i) => Value::Integer(i),
        ValueInner::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        ValueInner::Double(f) => Value::Real(f),
        ValueInner::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Blob(b.to_vec()),
        },
        ValueInner::Date(b) | ValueInner::Time(b) | ValueInner::Datetime(b) => Value::Blob(b.to_vec()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireType {
    Integer,
    Real,
    Text,
}

/// One wire type per column: numeric only when every cell agrees.
fn wire_types(result_set: &ResultSet) -> Vec<WireType> {
    (0..result_set.columns.len())
        .map(|i| {
            let mut cells = result_set.rows.iter().filter_map(|row| row.get(i)).peekable();
            if cells.peek().is_none() {
                return WireType::Text;
            }
            let mut integer = true;
            let mut real = true;
            for cell in cells {
                integer &= matches!(cell, Cell::Integer(_));
                real &= matches!(cell, Cell::Real(_));
            }
            if integer {
                WireType::Integer
            } else if real {
                WireType::Real
            } else {
                WireType::Text
            }
        })
        .collect()
}

fn write_result<W: io::Read + io::Write>(result: QueryResult, results: QueryResultWriter<W>) -> io::Result<()> {
    let Some(result_set) = result.result_set else {
        return results.completed(result.affected_rows, result.insert_id);
    };

    let types = wire_types(&result_set);
    let columns: Vec<Column> = result_set
        .columns
        .iter()
        .zip(&types)
        .map(|(name, wire_type)| Column {
            table: String::new(),
            column: name.clone(),
            coltype: match wire_type {
                WireType::Integer => ColumnType::MYSQL_TYPE_LONGLONG,
                WireType::Real => ColumnType::MYSQL_TYPE_DOUBLE,
                WireType::Text => ColumnType::MYSQL_TYPE_VAR_STRING,
            },
            colflags: ColumnFlags::empty(),
        })
        .collect();

    let mut rw = results.start(&columns)?;
    for row in &result_set.rows {
        for (cell, wire_type) in row.iter().zip(&types) {
            match (cell, wire_type) {
                (Cell::Integer(i), WireType::Integer) => rw.write_col(*i)?,
                (Cell::Real(f), WireType::Real) => rw.write_col(*f)?,
                (Cell::Bytes(b), _) => rw.write_col(b.as_slice())?,
                (cell, _) => rw.write_col(cell.to_text())?,
            }
        }
        rw.end_row()?;
    }
    rw.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_types() {
        let result_set = ResultSet {
            columns: vec!["a".into(), "b".into(), "c".into()],
            rows: vec![
                vec![Cell::Integer(1), Cell::Real(1.0), Cell::Integer(1)],
                vec![Cell::Integer(2), Cell::Real(2.0), Cell::Bytes(Vec::new())],
            ],
            binary: true,
        };
        assert_eq!(wire_types(&result_set), vec![WireType::Integer, WireType::Real, WireType::Text]);

        let empty = ResultSet {
            columns: vec!["a".into()],
            rows: Vec::new(),
            binary: false,
        };
        assert_eq!(wire_types(&empty), vec![WireType::Text]);
    }

    #[test]
    fn test_param_values() {
        assert_eq!(param_value(ValueInner::NULL), Value::Null);
        assert_eq!(param_value(ValueInner::Int(-4)), Value::Integer(-4));
        assert_eq!(param_value(ValueInner::UInt(7)), Value::Integer(7));
        assert_eq!(param_value(ValueInner::UInt(u64::MAX)), Value::Text(u64::MAX.to_string()));
        assert_eq!(param_value(ValueInner::Bytes(b"name")), Value::Text("name".to_string()));
        assert_eq!(param_value(ValueInner::Bytes(&[0xff, 0xfe])), Value::Blob(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            error_kind(&MySqliteError::UnknownStatement(3)),
            ErrorKind::ER_UNKNOWN_STMT_HANDLER
        ));
        assert!(matches!(
            error_kind(&MySqliteError::NotSupported("x".into())),
            ErrorKind::ER_NOT_SUPPORTED_YET
        ));
        assert!(matches!(error_kind(&MySqliteError::NoDatabaseSelected), ErrorKind::ER_NO_DB_ERROR));
    }
}
