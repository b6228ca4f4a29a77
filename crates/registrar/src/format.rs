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

use crate::error::{DatabaseError, Result};
use crate::executor::StatementExecutor;
use crate::query::Query;
use crate::types::ResultSet;
use std::io::{self, Write};
use tracing::warn;

pub const SEPARATOR_CELL: &str = "---------------";

/// Writes labels, the separator line and every row, each cell followed by a
/// tab. An empty result still produces the first two lines.
pub fn render_table<W: Write>(rs: &ResultSet, out: &mut W) -> io::Result<()> {
    for column in rs.columns() {
        write!(out, "{column}\t")?;
    }
    writeln!(out)?;

    for _ in rs.columns() {
        write!(out, "{SEPARATOR_CELL}\t")?;
    }
    writeln!(out)?;

    for row in rs.rows() {
        for value in row {
            write!(out, "{}\t", value.to_text())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Prints query results and per-query failures to a text sink.
pub struct ResultFormatter<W: Write> {
    out: W,
    numbered: bool,
}

impl<W: Write> ResultFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            numbered: false,
        }
    }

    /// Enables the `>> Query (n)` banner before each operation.
    pub fn numbered(mut self, numbered: bool) -> Self {
        self.numbered = numbered;
        self
    }

    pub fn banner(&mut self, number: usize) -> io::Result<()> {
        if self.numbered {
            writeln!(self.out, ">> Query ({number}) --------------------")?;
        }
        Ok(())
    }

    pub fn section(&mut self, title: &str) -> io::Result<()> {
        write!(self.out, "\n=== {title} ===\n")
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    /// Runs `query` and prints its table under a section header. A failed
    /// query prints the error and the statement text, then the error is
    /// handed back so the caller can record it; nothing else is aborted.
    pub async fn display<E>(&mut self, executor: &mut E, query: &Query) -> Result<usize>
    where
        E: StatementExecutor + ?Sized,
    {
        self.section(query.label())?;
        match executor.query(query).await {
            Ok(rs) => {
                render_table(&rs, &mut self.out)?;
                self.out.flush()?;
                Ok(rs.rows().len())
            }
            Err(e) => {
                warn!(label = query.label(), error = %e, state = %e.state, "query failed");
                writeln!(self.out, "SQL Error: {}", e.message)?;
                writeln!(self.out, "Query: {}", query.sql())?;
                if !query.params().is_empty() {
                    let params: Vec<String> = query.params().iter().map(|p| p.to_text()).collect();
                    writeln!(self.out, "Params: {}", params.join(", "))?;
                }
                self.out.flush()?;
                Err(e.into())
            }
        }
    }

    /// Runs a statement that returns no rows. Nothing is printed on success;
    /// a failure prints the section header, the error and the statement text,
    /// then the error is handed back.
    pub async fn apply<E>(&mut self, executor: &mut E, query: &Query) -> Result<u64>
    where
        E: StatementExecutor + ?Sized,
    {
        match executor.execute(query).await {
            Ok(affected) => Ok(affected),
            Err(e) => {
                warn!(label = query.label(), error = %e, state = %e.state, "statement failed");
                self.section(query.label())?;
                writeln!(self.out, "SQL Error: {}", e.message)?;
                writeln!(self.out, "Query: {}", query.sql())?;
                self.out.flush()?;
                Err(e.into())
            }
        }
    }

    /// The report printed when a failure ends the whole run.
    pub fn fatal(&mut self, error: &DatabaseError) -> io::Result<()> {
        writeln!(self.out, "SQL Exception: {}", error.message)?;
        writeln!(self.out, "Error Code: {}", error.code)?;
        writeln!(self.out, "SQLState: {}", error.state)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
