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

use crate::config::ConnectConfig;
use crate::error::{DatabaseError, RegistrarError, Result};
use crate::executor::{DbResult, StatementExecutor};
use crate::query::Query;
use crate::types::value::parse_date;
use crate::types::{ResultSet, Value};
use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rustls_pemfile::certs;
use std::error::Error as _;
use std::path::Path;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Column, Connection, NoTls, Row};
use tokio_postgres_rustls::MakeRustlsConnect;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

/// Executor backed by a single tokio-postgres client connection.
pub struct PgExecutor {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl PgExecutor {
    pub async fn connect(config: &ConnectConfig) -> Result<Self> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.schema)
            .user(&config.user)
            .application_name("registrar")
            .connect_timeout(config.connect_timeout());
        if !config.password.is_empty() {
            pg.password(&config.password);
        }

        info!(addr = %config.target(), tls = config.tls_ca_cert.is_some(), "connecting");
        let executor = match &config.tls_ca_cert {
            Some(ca) => {
                let tls = tls_connector_for_cert(ca)?;
                pg.ssl_mode(SslMode::Require);
                let (client, connection) = pg.connect(tls).await.map_err(map_pg_error)?;
                Self::from_parts(client, connection)
            }
            None => {
                pg.ssl_mode(SslMode::Disable);
                let (client, connection) = pg.connect(NoTls).await.map_err(map_pg_error)?;
                Self::from_parts(client, connection)
            }
        };
        Ok(executor)
    }

    fn from_parts<S, T>(client: Client, connection: Connection<S, T>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection ended with an error");
            }
        });
        Self {
            client: Some(client),
            connection: Some(handle),
        }
    }

    fn client(&self) -> DbResult<&Client> {
        match &self.client {
            Some(client) if !client.is_closed() => Ok(client),
            _ => Err(DatabaseError::connection("connection is closed")),
        }
    }
}

#[async_trait]
impl StatementExecutor for PgExecutor {
    async fn query(&mut self, query: &Query) -> DbResult<ResultSet> {
        let client = self.client()?;
        let stmt = client.prepare(query.sql()).await.map_err(map_pg_error)?;
        let params = bind_params(stmt.params(), query.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(PgParam::as_tosql).collect();
        let rows = client.query(&stmt, &refs).await.map_err(map_pg_error)?;

        let columns = stmt.columns();
        let mut out = ResultSet::new(columns.iter().map(|c| c.name().to_string()).collect());
        for row in &rows {
            out.push_row(pg_row_values(row, columns)?)?;
        }
        debug!(rows = out.rows().len(), "postgres query finished");
        Ok(out)
    }

    async fn execute(&mut self, query: &Query) -> DbResult<u64> {
        let client = self.client()?;
        let stmt = client.prepare(query.sql()).await.map_err(map_pg_error)?;
        let params = bind_params(stmt.params(), query.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(PgParam::as_tosql).collect();
        let affected = client.execute(&stmt, &refs).await.map_err(map_pg_error)?;
        debug!(affected, "postgres statement finished");
        Ok(affected)
    }

    async fn close(&mut self) -> DbResult<()> {
        // Dropping the client ends the connection task on its own.
        drop(self.client.take());
        if let Some(handle) = self.connection.take() {
            handle
                .await
                .map_err(|e| DatabaseError::connection(format!("connection task failed: {e}")))?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

impl Drop for PgExecutor {
    fn drop(&mut self) {
        self.client.take();
        if let Some(handle) = self.connection.take() {
            handle.abort();
        }
    }
}

/// Builds a rustls connector trusting only the certificates in `ca_path`.
pub fn tls_connector_for_cert(ca_path: &Path) -> Result<MakeRustlsConnect> {
    let roots = load_root_store(ca_path)?;
    let client_cfg = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(MakeRustlsConnect::new(client_cfg))
}

pub fn load_root_store(ca_path: &Path) -> Result<RootCertStore> {
    let cert_file = std::fs::File::open(ca_path)?;
    let mut cert_reader = std::io::BufReader::new(cert_file);
    let cert_chain = certs(&mut cert_reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RegistrarError::Tls(format!("parse {}: {e}", ca_path.display())))?;
    if cert_chain.is_empty() {
        return Err(RegistrarError::Tls(format!(
            "no certificates found in {}",
            ca_path.display()
        )));
    }

    let mut roots = RootCertStore::empty();
    for cert in cert_chain {
        roots
            .add(cert)
            .map_err(|e| RegistrarError::Tls(format!("add root cert: {e}")))?;
    }
    Ok(roots)
}

pub(crate) fn map_pg_error(err: tokio_postgres::Error) -> DatabaseError {
    if let Some(db) = err.as_db_error() {
        return DatabaseError::new(db.message(), 0, db.code().code());
    }
    let io_failure = err
        .source()
        .and_then(|s| s.downcast_ref::<std::io::Error>())
        .is_some();
    if err.is_closed() || io_failure {
        DatabaseError::connection(err.to_string())
    } else {
        DatabaseError::general(err.to_string())
    }
}

/// A parameter already coerced to the type the server inferred for its
/// placeholder.
#[derive(Debug, Clone, PartialEq)]
enum PgParam {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Numeric(Option<Decimal>),
    Text(Option<String>),
    Date(Option<Date>),
    Timestamp(Option<PrimitiveDateTime>),
    Bytes(Option<Vec<u8>>),
}

impl PgParam {
    fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            PgParam::Bool(value) => value,
            PgParam::Int2(value) => value,
            PgParam::Int4(value) => value,
            PgParam::Int8(value) => value,
            PgParam::Float4(value) => value,
            PgParam::Float8(value) => value,
            PgParam::Numeric(value) => value,
            PgParam::Text(value) => value,
            PgParam::Date(value) => value,
            PgParam::Timestamp(value) => value,
            PgParam::Bytes(value) => value,
        }
    }

    fn null_for(ty: &Type) -> Self {
        match *ty {
            Type::BOOL => PgParam::Bool(None),
            Type::INT2 => PgParam::Int2(None),
            Type::INT4 => PgParam::Int4(None),
            Type::INT8 => PgParam::Int8(None),
            Type::FLOAT4 => PgParam::Float4(None),
            Type::FLOAT8 => PgParam::Float8(None),
            Type::NUMERIC => PgParam::Numeric(None),
            Type::DATE => PgParam::Date(None),
            Type::TIMESTAMP => PgParam::Timestamp(None),
            Type::BYTEA => PgParam::Bytes(None),
            _ => PgParam::Text(None),
        }
    }
}

fn bind_params(types: &[Type], values: &[Value]) -> DbResult<Vec<PgParam>> {
    if types.len() != values.len() {
        return Err(DatabaseError::new(
            format!(
                "statement expects {} parameters but {} were bound",
                types.len(),
                values.len()
            ),
            0,
            "07001",
        ));
    }
    types
        .iter()
        .zip(values)
        .enumerate()
        .map(|(idx, (ty, value))| coerce_param(idx + 1, value, ty))
        .collect()
}

fn coerce_param(position: usize, value: &Value, ty: &Type) -> DbResult<PgParam> {
    let mismatch = || {
        DatabaseError::new(
            format!(
                "cannot bind {} value to parameter ${position} of type {ty}",
                value.type_name()
            ),
            0,
            "42804",
        )
    };
    let out_of_range = || {
        DatabaseError::new(
            format!("value for parameter ${position} is out of range for {ty}"),
            0,
            "22003",
        )
    };

    let param = match (value, ty) {
        (Value::Null, _) => PgParam::null_for(ty),
        (Value::Boolean(v), &Type::BOOL) => PgParam::Bool(Some(*v)),
        (Value::Int64(v), &Type::INT2) => {
            PgParam::Int2(Some(i16::try_from(*v).map_err(|_| out_of_range())?))
        }
        (Value::Int64(v), &Type::INT4) => {
            PgParam::Int4(Some(i32::try_from(*v).map_err(|_| out_of_range())?))
        }
        (Value::Int64(v), &Type::INT8) => PgParam::Int8(Some(*v)),
        (Value::Int64(v), &Type::FLOAT4) => PgParam::Float4(Some(*v as f32)),
        (Value::Int64(v), &Type::FLOAT8) => PgParam::Float8(Some(*v as f64)),
        (Value::Int64(v), &Type::NUMERIC) => PgParam::Numeric(Some(Decimal::from(*v))),
        (Value::Float64(v), &Type::FLOAT4) => PgParam::Float4(Some(*v as f32)),
        (Value::Float64(v), &Type::FLOAT8) => PgParam::Float8(Some(*v)),
        (Value::Float64(v), &Type::NUMERIC) => {
            PgParam::Numeric(Some(Decimal::from_f64(*v).ok_or_else(out_of_range)?))
        }
        (Value::Decimal(v), &Type::NUMERIC) => PgParam::Numeric(Some(*v)),
        (Value::Decimal(v), &Type::FLOAT8) => {
            PgParam::Float8(Some(v.to_f64().ok_or_else(out_of_range)?))
        }
        (Value::Decimal(v), &Type::FLOAT4) => {
            PgParam::Float4(Some(v.to_f32().ok_or_else(out_of_range)?))
        }
        (Value::Text(v), &Type::DATE) => PgParam::Date(Some(parse_date(v).ok_or_else(mismatch)?)),
        (Value::Text(v), ty) if is_text_type(ty) => PgParam::Text(Some(v.clone())),
        (Value::Date(v), &Type::DATE) => PgParam::Date(Some(*v)),
        (Value::Date(v), &Type::TIMESTAMP) => {
            PgParam::Timestamp(Some(PrimitiveDateTime::new(*v, Time::MIDNIGHT)))
        }
        (Value::Timestamp(v), &Type::TIMESTAMP) => PgParam::Timestamp(Some(*v)),
        (Value::Bytes(v), &Type::BYTEA) => PgParam::Bytes(Some(v.clone())),
        (v, ty) if is_text_type(ty) && !matches!(v, Value::Bytes(_)) => {
            PgParam::Text(Some(v.to_text()))
        }
        _ => return Err(mismatch()),
    };
    Ok(param)
}

fn is_text_type(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn pg_row_values(row: &Row, columns: &[Column]) -> DbResult<Vec<Value>> {
    let mut values = Vec::with_capacity(columns.len());
    for (idx, col) in columns.iter().enumerate() {
        let ty = col.type_();
        let value = match *ty {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx).map(Value::from),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .map(|v| Value::from(v.map(i64::from))),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .map(|v| Value::from(v.map(i64::from))),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx).map(Value::from),
            Type::OID => row
                .try_get::<_, Option<u32>>(idx)
                .map(|v| Value::from(v.map(i64::from))),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(idx)
                .map(|v| Value::from(v.map(f64::from))),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map(Value::from),
            Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx).map(Value::from),
            Type::DATE => row.try_get::<_, Option<Date>>(idx).map(Value::from),
            Type::TIMESTAMP => row
                .try_get::<_, Option<PrimitiveDateTime>>(idx)
                .map(|v| v.map(Value::Timestamp).unwrap_or(Value::Null)),
            Type::TIMESTAMPTZ => row.try_get::<_, Option<OffsetDateTime>>(idx).map(|v| {
                v.map(|ts| {
                    let utc = ts.to_offset(time::UtcOffset::UTC);
                    Value::Timestamp(PrimitiveDateTime::new(utc.date(), utc.time()))
                })
                .unwrap_or(Value::Null)
            }),
            Type::BYTEA => row
                .try_get::<_, Option<Vec<u8>>>(idx)
                .map(|v| v.map(Value::Bytes).unwrap_or(Value::Null)),
            _ => row.try_get::<_, Option<String>>(idx).map(Value::from),
        }
        .map_err(|e| {
            DatabaseError::general(format!(
                "cannot decode column {} of type {ty}: {e}",
                col.name()
            ))
        })?;
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use time::macros::date;

    #[test]
    fn integers_narrow_to_the_inferred_type() {
        assert_eq!(
            coerce_param(1, &Value::Int64(2), &Type::INT4).expect("int4"),
            PgParam::Int4(Some(2))
        );
        assert_eq!(
            coerce_param(1, &Value::Int64(3), &Type::INT8).expect("int8"),
            PgParam::Int8(Some(3))
        );
        let err = coerce_param(2, &Value::Int64(i64::MAX), &Type::INT2).expect_err("overflow");
        assert_eq!(err.state, "22003");
        assert!(err.message.contains("$2"));
    }

    #[test]
    fn decimal_binds_to_numeric_and_float_columns() {
        let gpa = Decimal::from_str("3.5").expect("decimal");
        assert_eq!(
            coerce_param(1, &Value::Decimal(gpa), &Type::NUMERIC).expect("numeric"),
            PgParam::Numeric(Some(gpa))
        );
        assert_eq!(
            coerce_param(1, &Value::Decimal(gpa), &Type::FLOAT8).expect("float8"),
            PgParam::Float8(Some(3.5))
        );
    }

    #[test]
    fn dates_bind_from_date_or_iso_text() {
        let d = date!(2021 - 01 - 01);
        assert_eq!(
            coerce_param(1, &Value::Date(d), &Type::DATE).expect("date"),
            PgParam::Date(Some(d))
        );
        assert_eq!(
            coerce_param(1, &Value::text("2021-01-01"), &Type::DATE).expect("text date"),
            PgParam::Date(Some(d))
        );
        assert!(coerce_param(1, &Value::text("January"), &Type::DATE).is_err());
    }

    #[test]
    fn null_takes_the_placeholder_type() {
        assert_eq!(
            coerce_param(1, &Value::Null, &Type::INT4).expect("null"),
            PgParam::Int4(None)
        );
        assert_eq!(
            coerce_param(1, &Value::Null, &Type::JSON).expect("null"),
            PgParam::Text(None)
        );
    }

    #[test]
    fn incompatible_types_are_rejected() {
        let err = coerce_param(1, &Value::text("IS"), &Type::INT4).expect_err("mismatch");
        assert_eq!(err.state, "42804");
        assert!(coerce_param(1, &Value::Bytes(vec![1]), &Type::TEXT).is_err());
    }

    #[test]
    fn scalars_bind_to_text_placeholders_as_text() {
        assert_eq!(
            coerce_param(1, &Value::Int64(66610), &Type::VARCHAR).expect("text"),
            PgParam::Text(Some("66610".to_string()))
        );
    }

    #[test]
    fn parameter_count_must_match() {
        let err = bind_params(&[Type::TEXT], &[]).expect_err("count mismatch");
        assert_eq!(err.state, "07001");
        assert!(!err.is_fatal());
    }
}
