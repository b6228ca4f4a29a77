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

use registrar::SqliteExecutor;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const UNIVERSITY_SQL: &str = include_str!("../../registrar/tests/fixtures/university.sql");

fn seeded_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("university.db");
    let mut exec = SqliteExecutor::open(&path).expect("open sqlite");
    exec.execute_batch(UNIVERSITY_SQL).expect("seed");
    path
}

fn registrar(db: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_registrar"))
        .arg("--backend")
        .arg("sqlite")
        .arg("--sqlite-path")
        .arg(db)
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn registrar")
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).expect("utf8 stdout")
}

#[test]
fn list_prints_labels_without_connecting() {
    let out = Command::new(env!("CARGO_BIN_EXE_registrar"))
        .args(["--list", "--host", "unreachable.invalid"])
        .output()
        .expect("spawn registrar");
    assert!(out.status.success());
    let text = stdout(&out);
    assert_eq!(text.lines().count(), 12);
    assert!(text.starts_with(" 1. Students majoring in IS\n"));
    assert!(text.contains("11. Inserted student Alice Smith\n"));
    assert!(text.ends_with("12. Updated student Bob Norbert\n"));
}

#[test]
fn full_run_on_sqlite_succeeds_and_is_repeatable() {
    let dir = TempDir::new().expect("tempdir");
    let db = seeded_db(&dir);

    let first = registrar(&db, &[]);
    assert_eq!(first.status.code(), Some(0));
    let text = stdout(&first);
    assert!(text.starts_with("\n=== Students majoring in IS ===\n"));
    assert!(text.contains("888-88-8888\tALICE\tSMITH\t"));
    assert!(text.ends_with("\nAll queries executed successfully!\n"));

    let second = registrar(&db, &["--only", "11"]);
    assert_eq!(second.status.code(), Some(0));
    assert!(stdout(&second).contains("Using '888-88-8100' instead"));
}

#[test]
fn numbered_banners_follow_selection() {
    let dir = TempDir::new().expect("tempdir");
    let db = seeded_db(&dir);
    let out = registrar(&db, &["--numbered", "--only", "10", "--only", "1"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.starts_with(">> Query (1) --------------------\n"));
    assert!(text.contains(">> Query (10) --------------------\n"));
    assert!(!text.contains(">> Query (2)"));
}

#[test]
fn operation_failures_exit_zero_unless_requested() {
    let dir = TempDir::new().expect("tempdir");
    let db = seeded_db(&dir);
    {
        let mut exec = SqliteExecutor::open(&db).expect("open");
        // Offering references Course; the bundled SQLite enforces foreign keys.
        exec.execute_batch("PRAGMA foreign_keys = OFF; DROP TABLE Course;").expect("drop");
    }

    let lenient = registrar(&db, &["--only", "5"]);
    assert_eq!(lenient.status.code(), Some(0));
    assert!(stdout(&lenient).contains("SQL Error: no such table: Course"));
    assert!(stdout(&lenient).ends_with("\n1 of 1 operations failed\n"));

    let strict = registrar(&db, &["--only", "5", "--fail-on-error"]);
    assert_eq!(strict.status.code(), Some(3));
}

#[test]
fn unopenable_database_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("missing").join("nested").join("u.db");
    let out = registrar(&db, &[]);
    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("SQL Exception: "));
    assert!(text.contains("SQLState: 08001\n"));
}

#[test]
fn out_of_range_selection_is_a_configuration_error() {
    let dir = TempDir::new().expect("tempdir");
    let db = seeded_db(&dir);
    let out = registrar(&db, &["--only", "13"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--only 13 is out of range"));
}
