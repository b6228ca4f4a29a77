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

use thiserror::Error;

/// SQLSTATE for a unique constraint violation.
pub const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE reported when nothing more specific is known.
pub const SQLSTATE_GENERAL_ERROR: &str = "HY000";
/// SQLSTATE for a dropped or unusable connection.
pub const SQLSTATE_CONNECTION_FAILURE: &str = "08006";
/// `ER_DUP_ENTRY` as reported by MySQL-compatible servers.
pub const MYSQL_ER_DUP_ENTRY: i32 = 1062;

/// A failure reported by the database or its driver.
///
/// `code` is the vendor numeric code and is 0 when the backend has none.
/// `state` is always a five-character SQLSTATE.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DatabaseError {
    pub message: String,
    pub code: i32,
    pub state: String,
}

impl DatabaseError {
    pub fn new(message: impl Into<String>, code: i32, state: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            state: state.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(message, 0, SQLSTATE_GENERAL_ERROR)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(message, 0, SQLSTATE_CONNECTION_FAILURE)
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.state == SQLSTATE_UNIQUE_VIOLATION || self.code == MYSQL_ER_DUP_ENTRY
    }

    /// Connection exceptions (class 08) and authorization failures (class 28)
    /// leave nothing useful to do for the remaining statements.
    pub fn is_fatal(&self) -> bool {
        self.state.starts_with("08") || self.state.starts_with("28")
    }
}

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("tls setup failed: {0}")]
    Tls(String),
}

impl RegistrarError {
    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self {
            Self::Database(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Database(e) => e.is_fatal(),
            Self::Io(_) => true,
            Self::Config(_) | Self::Tls(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistrarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_detected_by_state_or_vendor_code() {
        assert!(DatabaseError::new("dup", 0, "23505").is_duplicate_key());
        assert!(DatabaseError::new("dup", MYSQL_ER_DUP_ENTRY, "23000").is_duplicate_key());
        assert!(!DatabaseError::new("fk", 0, "23503").is_duplicate_key());
    }

    #[test]
    fn connection_and_auth_classes_are_fatal() {
        assert!(DatabaseError::connection("gone").is_fatal());
        assert!(DatabaseError::new("bad password", 0, "28P01").is_fatal());
        assert!(!DatabaseError::new("syntax", 0, "42601").is_fatal());
        assert!(!DatabaseError::general("boom").is_fatal());
    }

    #[test]
    fn io_errors_end_the_run() {
        let err = RegistrarError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdout closed",
        ));
        assert!(err.is_fatal());
        assert!(err.as_database().is_none());
    }
}
