/*
 * Copyright 2026 EntDB Authors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::error::{DatabaseError, Result, SQLSTATE_UNIQUE_VIOLATION};
use crate::executor::{DbResult, StatementExecutor};
use crate::query::{numbered_to_question_placeholders, Query};
use crate::types::value::format_date;
use crate::types::{ResultSet, Value};
use async_trait::async_trait;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;
use tracing::{debug, info};

/// In-process executor over an SQLite database file (or `:memory:`).
pub struct SqliteExecutor {
    conn: Option<Connection>,
}

impl SqliteExecutor {
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening sqlite database");
        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }

    /// Runs a semicolon-separated script without parameters.
    pub fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.conn()?.execute_batch(sql).map_err(map_sqlite_error)
    }

    fn conn(&self) -> DbResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("connection is closed"))
    }
}

#[async_trait]
impl StatementExecutor for SqliteExecutor {
    async fn query(&mut self, query: &Query) -> DbResult<ResultSet> {
        let sql = numbered_to_question_placeholders(query.sql());
        let mut stmt = self.conn()?.prepare(&sql).map_err(map_sqlite_error)?;
        check_param_count(stmt.parameter_count(), query.params().len())?;

        let mut out = ResultSet::new(stmt.column_names().into_iter().map(String::from).collect());
        let width = out.column_count();
        let params: Vec<SqliteValue> = query.params().iter().map(to_sqlite_value).collect();
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(map_sqlite_error)?;
        while let Some(row) = rows.next().map_err(map_sqlite_error)? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let cell = row.get_ref(idx).map_err(map_sqlite_error)?;
                values.push(sqlite_value_to_value(cell)?);
            }
            out.push_row(values)?;
        }
        debug!(rows = out.rows().len(), "sqlite query finished");
        Ok(out)
    }

    async fn execute(&mut self, query: &Query) -> DbResult<u64> {
        let sql = numbered_to_question_placeholders(query.sql());
        let mut stmt = self.conn()?.prepare(&sql).map_err(map_sqlite_error)?;
        check_param_count(stmt.parameter_count(), query.params().len())?;
        let params: Vec<SqliteValue> = query.params().iter().map(to_sqlite_value).collect();
        let affected = stmt
            .execute(params_from_iter(params.iter()))
            .map_err(map_sqlite_error)?;
        debug!(affected, "sqlite statement finished");
        Ok(affected as u64)
    }

    async fn close(&mut self) -> DbResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| map_sqlite_error(e))?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn check_param_count(expected: usize, bound: usize) -> DbResult<()> {
    if expected != bound {
        return Err(DatabaseError::new(
            format!("statement expects {expected} parameters but {bound} were bound"),
            0,
            "07001",
        ));
    }
    Ok(())
}

fn to_sqlite_value(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Boolean(v) => SqliteValue::Integer(i64::from(*v)),
        Value::Int64(v) => SqliteValue::Integer(*v),
        Value::Float64(v) => SqliteValue::Real(*v),
        Value::Decimal(v) => v
            .to_f64()
            .map(SqliteValue::Real)
            .unwrap_or_else(|| SqliteValue::Text(v.to_string())),
        Value::Text(v) => SqliteValue::Text(v.clone()),
        Value::Date(v) => SqliteValue::Text(format_date(*v)),
        Value::Timestamp(_) => SqliteValue::Text(value.to_text()),
        Value::Bytes(v) => SqliteValue::Blob(v.clone()),
    }
}

fn sqlite_value_to_value(value: ValueRef<'_>) -> DbResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::Int64(v)),
        ValueRef::Real(v) => Ok(Value::Float64(v)),
        ValueRef::Text(v) => {
            let text = std::str::from_utf8(v)
                .map_err(|e| DatabaseError::general(format!("sqlite text decode failed: {e}")))?;
            Ok(Value::Text(text.to_string()))
        }
        ValueRef::Blob(v) => Ok(Value::Bytes(v.to_vec())),
    }
}

pub(crate) fn map_sqlite_error(err: rusqlite::Error) -> DatabaseError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let message = message.clone().unwrap_or_else(|| failure.to_string());
            DatabaseError::new(message, failure.extended_code, sqlstate_for(failure))
        }
        rusqlite::Error::SqlInputError { error, msg, .. } => {
            DatabaseError::new(msg.clone(), error.extended_code, sqlstate_for(error))
        }
        _ => DatabaseError::general(err.to_string()),
    }
}

fn sqlstate_for(failure: &rusqlite::ffi::Error) -> &'static str {
    match failure.code {
        ErrorCode::ConstraintViolation => match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                SQLSTATE_UNIQUE_VIOLATION
            }
            _ => "23000",
        },
        ErrorCode::CannotOpen | ErrorCode::NotADatabase => "08001",
        ErrorCode::ReadOnly => "25006",
        ErrorCode::PermissionDenied => "42501",
        _ => "HY000",
    }
}
