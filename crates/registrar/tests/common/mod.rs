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

#![allow(dead_code)]

use async_trait::async_trait;
use registrar::executor::DbResult;
use registrar::{DatabaseError, Query, ResultSet, SqliteExecutor, StatementExecutor, Value};
use std::collections::HashSet;

pub const UNIVERSITY_SQL: &str = include_str!("../fixtures/university.sql");

pub fn university_db() -> SqliteExecutor {
    let mut exec = SqliteExecutor::open_in_memory().expect("open sqlite");
    exec.execute_batch(UNIVERSITY_SQL).expect("seed university schema");
    exec
}

pub fn output_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).expect("utf8 output")
}

/// A failure injected for statements whose SQL contains `needle`.
pub struct InjectedFailure {
    pub needle: String,
    pub error: DatabaseError,
    pub remaining: usize,
}

/// In-memory stand-in for a database: knows a set of taken student numbers,
/// answers `COUNT(*)` probes from it, and returns an empty one-column result
/// for every other query.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub taken: HashSet<String>,
    pub failures: Vec<InjectedFailure>,
    pub log: Vec<Query>,
    pub closed: bool,
}

impl ScriptedExecutor {
    pub fn with_taken<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn fail_on(mut self, needle: &str, error: DatabaseError, times: usize) -> Self {
        self.failures.push(InjectedFailure {
            needle: needle.to_string(),
            error,
            remaining: times,
        });
        self
    }

    pub fn probe_count(&self) -> usize {
        self.log
            .iter()
            .filter(|q| q.sql().starts_with("SELECT COUNT(*)"))
            .count()
    }

    pub fn probed_keys(&self) -> Vec<String> {
        self.log
            .iter()
            .filter(|q| q.sql().starts_with("SELECT COUNT(*)"))
            .map(|q| q.params()[0].to_text())
            .collect()
    }

    fn injected(&mut self, sql: &str) -> Option<DatabaseError> {
        let failure = self
            .failures
            .iter_mut()
            .find(|f| f.remaining > 0 && sql.contains(&f.needle))?;
        failure.remaining -= 1;
        Some(failure.error.clone())
    }
}

#[async_trait]
impl StatementExecutor for ScriptedExecutor {
    async fn query(&mut self, query: &Query) -> DbResult<ResultSet> {
        if self.closed {
            return Err(DatabaseError::connection("connection is closed"));
        }
        self.log.push(query.clone());
        if let Some(e) = self.injected(query.sql()) {
            return Err(e);
        }
        if query.sql().starts_with("SELECT COUNT(*)") {
            let key = query.params()[0].to_text();
            let count = i64::from(self.taken.contains(&key));
            return ResultSet::with_rows(vec!["count".to_string()], vec![vec![Value::Int64(count)]]);
        }
        Ok(ResultSet::new(vec!["result".to_string()]))
    }

    async fn execute(&mut self, query: &Query) -> DbResult<u64> {
        if self.closed {
            return Err(DatabaseError::connection("connection is closed"));
        }
        self.log.push(query.clone());
        if let Some(e) = self.injected(query.sql()) {
            return Err(e);
        }
        if query.sql().starts_with("INSERT") {
            let key = query.params()[0].to_text();
            if !self.taken.insert(key.clone()) {
                return Err(DatabaseError::new(
                    format!("duplicate key value violates unique constraint: {key}"),
                    0,
                    "23505",
                ));
            }
        }
        Ok(1)
    }

    async fn close(&mut self) -> DbResult<()> {
        self.closed = true;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
