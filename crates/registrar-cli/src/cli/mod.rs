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

use clap::{Parser, ValueEnum};
use registrar::config::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_PG_PORT};
use registrar::workload::{DEFAULT_FALLBACK_STUDENT_ID, DEFAULT_STUDENT_ID};
use registrar::{Backend, ConnectConfig, Operation, RegistrarError, Result, WorkloadOptions};
use std::path::PathBuf;
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Postgres,
    Sqlite,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Postgres => Backend::Postgres,
            BackendArg::Sqlite => Backend::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "registrar",
    about = "Runs the registrar reports, enrollment insert and address update"
)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = BackendArg::Postgres)]
    pub backend: BackendArg,

    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(short, long, default_value_t = DEFAULT_PG_PORT)]
    pub port: u16,

    /// Database to connect to.
    #[arg(short, long, alias = "database", default_value = "university")]
    pub schema: String,

    #[arg(short, long, default_value = "postgres")]
    pub user: String,

    #[arg(long, default_value = "")]
    pub password: String,

    #[arg(long)]
    pub password_env: Option<String>,

    #[arg(long)]
    pub password_file: Option<String>,

    /// Database file for the sqlite backend.
    #[arg(long = "sqlite-path", alias = "db")]
    pub sqlite_path: Option<PathBuf>,

    /// PEM root certificate; enables TLS for postgres.
    #[arg(long)]
    pub tls_ca_cert: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    /// Print a `>> Query (n)` banner before each operation.
    #[arg(long)]
    pub numbered: bool,

    /// Print the operation list and exit without connecting.
    #[arg(long)]
    pub list: bool,

    /// Run only operation <N>; repeat to select several.
    #[arg(long = "only", value_name = "N")]
    pub only: Vec<usize>,

    #[arg(long, default_value = DEFAULT_STUDENT_ID)]
    pub student_id: String,

    #[arg(long, default_value = DEFAULT_FALLBACK_STUDENT_ID)]
    pub fallback_student_id: String,

    /// Exit with status 3 when any operation failed.
    #[arg(long)]
    pub fail_on_error: bool,
}

impl Cli {
    pub fn connect_config(&self, password: String) -> ConnectConfig {
        ConnectConfig {
            backend: self.backend.into(),
            host: self.host.clone(),
            port: self.port,
            schema: self.schema.clone(),
            user: self.user.clone(),
            password,
            sqlite_path: self.sqlite_path.clone(),
            tls_ca_cert: self.tls_ca_cert.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
        }
    }

    pub fn workload_options(&self, today: Date) -> WorkloadOptions {
        WorkloadOptions {
            today,
            student_id: self.student_id.clone(),
            fallback_student_id: self.fallback_student_id.clone(),
        }
    }
}

/// Password precedence: file, then environment variable, then the flag.
pub fn resolve_password(cli: &Cli) -> Result<String> {
    if let Some(path) = &cli.password_file {
        let content = std::fs::read_to_string(path)?;
        let pw = content.trim_end().to_string();
        if pw.is_empty() {
            return Err(RegistrarError::Config(format!(
                "empty password in --password-file '{path}'"
            )));
        }
        return Ok(pw);
    }
    if let Some(env_name) = &cli.password_env {
        let pw = std::env::var(env_name).map_err(|_| {
            RegistrarError::Config(format!("env var '{env_name}' not set for --password-env"))
        })?;
        if pw.is_empty() {
            return Err(RegistrarError::Config(format!("env var '{env_name}' is empty")));
        }
        return Ok(pw);
    }
    Ok(cli.password.clone())
}

/// Pairs each operation with its 1-based number. An empty `only` keeps all of
/// them; otherwise the listed numbers run in ascending order, once each.
pub fn select_operations<'a>(
    operations: &'a [Operation],
    only: &[usize],
) -> Result<Vec<(usize, &'a Operation)>> {
    if only.is_empty() {
        return Ok(operations.iter().enumerate().map(|(i, op)| (i + 1, op)).collect());
    }
    let mut wanted = only.to_vec();
    wanted.sort_unstable();
    wanted.dedup();
    wanted
        .into_iter()
        .map(|n| match n.checked_sub(1).and_then(|i| operations.get(i)) {
            Some(op) => Ok((n, op)),
            None => Err(RegistrarError::Config(format!(
                "--only {n} is out of range, expected 1..={}",
                operations.len()
            ))),
        })
        .collect()
}
