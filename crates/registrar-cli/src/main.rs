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

use clap::Parser;
use registrar::{
    connect, registrar_workload, Operation, RegistrarError, ResultFormatter, Runner,
    StatementExecutor,
};
use registrar_cli::cli::{resolve_password, select_operations, Cli};
use std::io::{self, Write};
use std::process::ExitCode;
use time::OffsetDateTime;
use tracing::{info, warn};

const EXIT_FATAL: u8 = 1;
const EXIT_OPERATIONS_FAILED: u8 = 3;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn list_operations(operations: &[Operation]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for (idx, op) in operations.iter().enumerate() {
        writeln!(out, "{:>2}. {}", idx + 1, op.label())?;
    }
    out.flush()
}

async fn drive<W: Write>(
    runner: &mut Runner<'_, dyn StatementExecutor, W>,
    selected: &[(usize, &Operation)],
    fail_on_error: bool,
) -> Result<ExitCode, RegistrarError> {
    match runner.run_numbered(selected).await {
        Ok(report) => {
            runner.finish(&report)?;
            info!(
                attempted = report.attempted,
                failed = report.failures.len(),
                "run complete"
            );
            if fail_on_error && !report.all_succeeded() {
                Ok(ExitCode::from(EXIT_OPERATIONS_FAILED))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(e) => {
            match e.as_database() {
                Some(db) => runner.formatter().fatal(db)?,
                None => eprintln!("error: {e}"),
            }
            Ok(ExitCode::from(EXIT_FATAL))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, RegistrarError> {
    let today = OffsetDateTime::now_utc().date();
    let operations = registrar_workload(&cli.workload_options(today));
    if cli.list {
        list_operations(&operations)?;
        return Ok(ExitCode::SUCCESS);
    }

    let selected = select_operations(&operations, &cli.only)?;
    let config = cli.connect_config(resolve_password(&cli)?);
    info!(addr = %config.target(), operations = selected.len(), "starting run");

    let mut formatter = ResultFormatter::new(io::stdout().lock()).numbered(cli.numbered);
    let mut executor = match connect(&config).await {
        Ok(executor) => executor,
        Err(RegistrarError::Database(db)) => {
            formatter.fatal(&db)?;
            return Ok(ExitCode::from(EXIT_FATAL));
        }
        Err(e) => return Err(e),
    };

    let outcome = match Runner::new(executor.as_mut(), formatter) {
        Ok(mut runner) => drive(&mut runner, &selected, cli.fail_on_error).await,
        Err(e) => Err(e),
    };
    if let Err(e) = executor.close().await {
        warn!(error = %e, "closing the connection failed");
    }
    outcome
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
