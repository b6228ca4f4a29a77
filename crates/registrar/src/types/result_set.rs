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

use crate::error::DatabaseError;
use crate::types::Value;
use rust_decimal::prelude::ToPrimitive;

/// Column labels plus fully materialized rows. Every row has one value per
/// column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> std::result::Result<Self, DatabaseError> {
        let mut out = Self::new(columns);
        for row in rows {
            out.push_row(row)?;
        }
        Ok(out)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> std::result::Result<(), DatabaseError> {
        if row.len() != self.columns.len() {
            return Err(DatabaseError::general(format!(
                "row has {} values but the result has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row as an integer, for `COUNT(*)` style
    /// queries.
    pub fn scalar_i64(&self) -> std::result::Result<i64, DatabaseError> {
        let cell = self
            .rows
            .first()
            .and_then(|r| r.first())
            .ok_or_else(|| DatabaseError::general("scalar query returned no rows"))?;
        match cell {
            Value::Int64(v) => Ok(*v),
            Value::Decimal(v) => v
                .to_i64()
                .ok_or_else(|| DatabaseError::general(format!("non-integer scalar {v}"))),
            Value::Text(v) => v
                .trim()
                .parse::<i64>()
                .map_err(|e| DatabaseError::general(format!("non-integer scalar {v:?}: {e}"))),
            other => Err(DatabaseError::general(format!(
                "expected an integer scalar, got {}",
                other.type_name()
            ))),
        }
    }
}
