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

use crate::error::{DatabaseError, RegistrarError, Result, SQLSTATE_UNIQUE_VIOLATION};
use crate::executor::StatementExecutor;
use crate::format::ResultFormatter;
use crate::probe::{find_unique_id, KeyColumn};
use crate::query::Query;
use crate::workload::{student_key, student_lookup, Operation, Student};
use std::io::Write;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub number: usize,
    pub label: String,
    pub message: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: usize,
    pub failures: Vec<OperationFailure>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs operations one after another. A failing operation is printed and
/// recorded; only fatal errors (lost connection, rejected credentials, a
/// broken output sink) stop the sequence.
pub struct Runner<'a, E: StatementExecutor + ?Sized, W: Write> {
    executor: &'a mut E,
    formatter: ResultFormatter<W>,
    key: KeyColumn,
}

impl<'a, E: StatementExecutor + ?Sized, W: Write> Runner<'a, E, W> {
    pub fn new(executor: &'a mut E, formatter: ResultFormatter<W>) -> Result<Self> {
        Ok(Self {
            executor,
            formatter,
            key: student_key()?,
        })
    }

    /// Runs `operations` numbered from 1.
    pub async fn run(&mut self, operations: &[Operation]) -> Result<RunReport> {
        let numbered: Vec<(usize, &Operation)> = operations
            .iter()
            .enumerate()
            .map(|(idx, op)| (idx + 1, op))
            .collect();
        self.run_numbered(&numbered).await
    }

    pub async fn run_numbered(&mut self, operations: &[(usize, &Operation)]) -> Result<RunReport> {
        let mut report = RunReport::default();
        for (number, op) in operations {
            report.attempted += 1;
            info!(number, label = op.label(), backend = self.executor.backend_name(), "running operation");
            self.formatter.banner(*number)?;
            match self.run_operation(op).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!(number, error = %e, "fatal error, stopping run");
                    return Err(e);
                }
                Err(e) => {
                    let (message, state) = match e.as_database() {
                        Some(db) => (db.message.clone(), db.state.clone()),
                        None => (e.to_string(), String::new()),
                    };
                    report.failures.push(OperationFailure {
                        number: *number,
                        label: op.label().to_string(),
                        message,
                        state,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Prints the closing line for `report`.
    pub fn finish(&mut self, report: &RunReport) -> Result<()> {
        if report.all_succeeded() {
            self.formatter.line("\nAll queries executed successfully!")?;
        } else {
            self.formatter.line(&format!(
                "\n{} of {} operations failed",
                report.failures.len(),
                report.attempted
            ))?;
        }
        Ok(())
    }

    pub fn formatter(&mut self) -> &mut ResultFormatter<W> {
        &mut self.formatter
    }

    pub fn into_formatter(self) -> ResultFormatter<W> {
        self.formatter
    }

    async fn run_operation(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Report(query) => {
                self.formatter.display(&mut *self.executor, query).await?;
                Ok(())
            }
            Operation::InsertStudent {
                label,
                student,
                fallback_id,
            } => self.insert_student(label, student, fallback_id).await,
            Operation::Update { change, verify } => self.update(change, verify).await,
        }
    }

    async fn update(&mut self, change: &Query, verify: &Query) -> Result<()> {
        let affected = self.formatter.apply(&mut *self.executor, change).await?;
        info!(affected, label = change.label(), "update applied");
        self.formatter.display(&mut *self.executor, verify).await?;
        Ok(())
    }

    async fn insert_student(&mut self, label: &str, student: &Student, fallback_id: &str) -> Result<()> {
        let err = match self.probe_and_insert(student).await {
            Ok(Some(std_no)) => {
                self.formatter
                    .display(&mut *self.executor, &student_lookup(label, &std_no))
                    .await?;
                return Ok(());
            }
            Ok(None) => {
                self.formatter
                    .section("Error: Could not find a unique student ID")?;
                return Err(DatabaseError::new(
                    format!("no unused student identifier derived from {}", student.std_no),
                    0,
                    SQLSTATE_UNIQUE_VIOLATION,
                )
                .into());
            }
            Err(RegistrarError::Database(e)) if !e.is_fatal() => e,
            Err(other) => return Err(other),
        };

        self.formatter
            .section(&format!("Error inserting student: {}", err.message))?;
        self.formatter.line(&format!("Error Code: {}", err.code))?;
        self.formatter.line(&format!("SQLState: {}", err.state))?;
        if !err.is_duplicate_key() {
            return Err(err.into());
        }

        // One retry under the fallback identifier, no further probing.
        self.formatter
            .line(&format!("Trying with alternative student ID: {fallback_id}"))?;
        match self
            .executor
            .execute(&student.insert_query(fallback_id))
            .await
        {
            Ok(_) => {
                let lookup = student_lookup(format!("{label} (with alternative ID)"), fallback_id);
                self.formatter.display(&mut *self.executor, &lookup).await?;
                Ok(())
            }
            Err(retry) if retry.is_fatal() => Err(retry.into()),
            Err(retry) => {
                self.formatter.section(&format!(
                    "Error inserting student with alternative ID: {}",
                    retry.message
                ))?;
                Err(retry.into())
            }
        }
    }

    /// Picks a free identifier and inserts under it. `Ok(None)` when every
    /// alternate is taken.
    async fn probe_and_insert(&mut self, student: &Student) -> Result<Option<String>> {
        let base = student.std_no.as_str();
        let Some(std_no) = find_unique_id(&mut *self.executor, &self.key, base).await? else {
            return Ok(None);
        };
        if std_no != base {
            self.formatter.section(&format!(
                "Student ID '{base}' already exists. Using '{std_no}' instead"
            ))?;
        }
        self.executor.execute(&student.insert_query(&std_no)).await?;
        info!(std_no = %std_no, name = %student.display_name(), "student inserted");
        Ok(Some(std_no))
    }
}
