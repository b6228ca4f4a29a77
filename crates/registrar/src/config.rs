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

use crate::error::{RegistrarError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// A PostgreSQL server reached over the network.
    Postgres,
    /// An SQLite database file opened in-process.
    Sqlite,
}

#[derive(Clone)]
pub struct ConnectConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    /// Database (schema) to select after connecting.
    pub schema: String,
    pub user: String,
    pub password: String,
    pub sqlite_path: Option<PathBuf>,
    pub tls_ca_cert: Option<PathBuf>,
    pub connect_timeout_ms: u64,
}

impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("sqlite_path", &self.sqlite_path)
            .field("tls_ca_cert", &self.tls_ca_cert)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

impl ConnectConfig {
    pub fn postgres(
        host: impl Into<String>,
        schema: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            backend: Backend::Postgres,
            host: host.into(),
            port: DEFAULT_PG_PORT,
            schema: schema.into(),
            user: user.into(),
            password: password.into(),
            sqlite_path: None,
            tls_ca_cert: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Sqlite,
            host: String::new(),
            port: DEFAULT_PG_PORT,
            schema: String::new(),
            user: String::new(),
            password: String::new(),
            sqlite_path: Some(path.into()),
            tls_ca_cert: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn sqlite_path(&self) -> Result<&Path> {
        self.sqlite_path
            .as_deref()
            .ok_or_else(|| RegistrarError::Config("sqlite backend needs a database path".to_string()))
    }

    /// Short human-readable target, never including the password.
    pub fn target(&self) -> String {
        match self.backend {
            Backend::Postgres => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.schema
            ),
            Backend::Sqlite => match &self.sqlite_path {
                Some(p) => format!("sqlite:{}", p.display()),
                None => "sqlite:<unset>".to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.backend {
            Backend::Postgres => {
                if self.host.trim().is_empty() {
                    return Err(RegistrarError::Config("host cannot be empty".to_string()));
                }
                if self.port == 0 {
                    return Err(RegistrarError::Config("port must be > 0".to_string()));
                }
                if self.schema.trim().is_empty() {
                    return Err(RegistrarError::Config("schema cannot be empty".to_string()));
                }
                if self.user.trim().is_empty() {
                    return Err(RegistrarError::Config("user cannot be empty".to_string()));
                }
                if self.connect_timeout_ms == 0 {
                    return Err(RegistrarError::Config(
                        "connect_timeout_ms must be > 0".to_string(),
                    ));
                }
                if let Some(cert) = &self.tls_ca_cert {
                    if !cert.exists() {
                        return Err(RegistrarError::Config(format!(
                            "tls_ca_cert path does not exist: {}",
                            cert.display()
                        )));
                    }
                }
            }
            Backend::Sqlite => {
                let path = self.sqlite_path()?;
                if path.as_os_str().is_empty() {
                    return Err(RegistrarError::Config(
                        "sqlite path cannot be empty".to_string(),
                    ));
                }
                if self.tls_ca_cert.is_some() {
                    return Err(RegistrarError::Config(
                        "tls_ca_cert only applies to the postgres backend".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
