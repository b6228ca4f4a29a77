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

pub mod postgres;
pub mod sqlite;

use crate::config::{Backend, ConnectConfig};
use crate::error::{DatabaseError, Result};
use crate::query::Query;
use crate::types::ResultSet;
use async_trait::async_trait;

pub use postgres::PgExecutor;
pub use sqlite::SqliteExecutor;

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// The statement-execution capability the formatter, prober and runner are
/// written against. Implementations run one statement at a time.
#[async_trait]
pub trait StatementExecutor: Send {
    /// Runs a row-returning statement and materializes the whole result.
    async fn query(&mut self, query: &Query) -> DbResult<ResultSet>;

    /// Runs a statement that returns no rows; yields the affected row count.
    async fn execute(&mut self, query: &Query) -> DbResult<u64>;

    /// Releases the connection. Further calls fail with a connection error.
    async fn close(&mut self) -> DbResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Opens the backend named by `config`. The config is validated first.
pub async fn connect(config: &ConnectConfig) -> Result<Box<dyn StatementExecutor>> {
    config.validate()?;
    match config.backend {
        Backend::Postgres => Ok(Box::new(PgExecutor::connect(config).await?)),
        Backend::Sqlite => Ok(Box::new(SqliteExecutor::open(config.sqlite_path()?)?)),
    }
}
