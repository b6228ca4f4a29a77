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

pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod probe;
pub mod query;
pub mod runner;
pub mod types;
pub mod workload;

pub use config::{Backend, ConnectConfig};
pub use error::{DatabaseError, RegistrarError, Result};
pub use executor::{connect, PgExecutor, SqliteExecutor, StatementExecutor};
pub use format::{render_table, ResultFormatter};
pub use probe::{find_unique_id, KeyColumn};
pub use query::Query;
pub use runner::{OperationFailure, RunReport, Runner};
pub use types::{ResultSet, Value};
pub use workload::{registrar_workload, Operation, Student, WorkloadOptions};
