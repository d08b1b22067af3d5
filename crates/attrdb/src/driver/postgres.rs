//! PostgreSQL via the blocking `postgres` client.

use super::{Connection, DriverError, ResultColumn, ResultSet, connection_error};
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::value::Value;
use bytes::BytesMut;
use postgres::types::{FromSql, IsNull, ToSql, Type};
use postgres::{Client, NoTls};
use rust_decimal::Decimal;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Sync + Send>;

/// Directory holding the local server socket, used when no host is given.
#[cfg(unix)]
const SOCKET_DIR: &str = "/var/run/postgresql";

pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let mut pg = postgres::Config::new();
        pg.dbname(&config.database);
        match &config.host {
            Some(host) => {
                pg.host(host);
            }
            #[cfg(unix)]
            None => {
                pg.host_path(SOCKET_DIR);
            }
            #[cfg(not(unix))]
            None => {
                pg.host("localhost");
            }
        }
        if let Some(port) = config.effective_port() {
            pg.port(port);
        }
        if let Some(user) = &config.username {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }

        let client = pg.connect(NoTls).map_err(|e| connection_error(config, e))?;
        Ok(Self { client })
    }

    /// Wrap an already-connected client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn driver_error(e: postgres::Error) -> DriverError {
    let code = e.code().map(|c| c.code().to_string()).unwrap_or_default();
    let message = match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    };
    DriverError::new(code, message)
}

fn as_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Connection for PgConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> std::result::Result<ResultSet, DriverError> {
        let stmt = self.client.prepare(sql).map_err(driver_error)?;
        let columns = stmt
            .columns()
            .iter()
            .map(|c| ResultColumn::new(c.name()))
            .collect();
        let rows = self
            .client
            .query(&stmt, &as_params(params))
            .map_err(driver_error)?;

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.try_get::<_, Value>(i))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(driver_error)?;
        Ok(ResultSet { columns, rows })
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> std::result::Result<u64, DriverError> {
        self.client
            .execute(sql, &as_params(params))
            .map_err(driver_error)
    }

    fn batch_execute(&mut self, sql: &str) -> std::result::Result<(), DriverError> {
        self.client.batch_execute(sql).map_err(driver_error)
    }
}

/// Parameters adapt to the type the server inferred for their placeholder.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Text(s) => text_to_sql(s, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    postgres::types::to_sql_checked!();
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        Type::FLOAT4 | Type::FLOAT8 => float_to_sql(v as f64, ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        _ => text_to_sql(&v.to_string(), ty, out),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        _ => text_to_sql(&v.to_string(), ty, out),
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => int_to_sql(s.trim().parse()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 => float_to_sql(s.trim().parse()?, ty, out),
        Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
        Type::BOOL => parse_bool(s)?.to_sql(ty, out),
        Type::DATE => s.trim().parse::<chrono::NaiveDate>()?.to_sql(ty, out),
        Type::TIME => s.trim().parse::<chrono::NaiveTime>()?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => s
            .trim()
            .parse::<chrono::DateTime<chrono::FixedOffset>>()?
            .to_sql(ty, out),
        Type::UUID => s.trim().parse::<uuid::Uuid>()?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        _ => {
            out.extend_from_slice(s.as_bytes());
            Ok(IsNull::No)
        }
    }
}

fn parse_bool(s: &str) -> std::result::Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "on" => Ok(true),
        "f" | "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("invalid boolean: {other}").into()),
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<chrono::NaiveDateTime, BoxError> {
    let s = s.trim();
    Ok(chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| s.parse::<chrono::NaiveDateTime>())?)
}

/// Every column type reads back as the closest scalar; anything without a
/// numeric mapping becomes text.
impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(match *ty {
            Type::BOOL => Value::from(bool::from_sql(ty, raw)?),
            Type::CHAR => Value::from(i8::from_sql(ty, raw)?),
            Type::INT2 => Value::from(i16::from_sql(ty, raw)?),
            Type::INT4 => Value::from(i32::from_sql(ty, raw)?),
            Type::INT8 => Value::from(i64::from_sql(ty, raw)?),
            Type::OID => Value::from(u32::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::from(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Value::from(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Text(Decimal::from_sql(ty, raw)?.to_string()),
            Type::DATE => Value::Text(chrono::NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => Value::Text(chrono::NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => Value::Text(chrono::NaiveDateTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMPTZ => Value::Text(
                chrono::DateTime::<chrono::Utc>::from_sql(ty, raw)?.to_rfc3339(),
            ),
            Type::UUID => Value::Text(uuid::Uuid::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => {
                Value::Text(serde_json::Value::from_sql(ty, raw)?.to_string())
            }
            _ => Value::Text(String::from_utf8_lossy(raw).into_owned()),
        })
    }

    fn from_sql_null(_ty: &Type) -> std::result::Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(v: &Value, ty: &Type) -> Vec<u8> {
        let mut out = BytesMut::new();
        let is_null = v.to_sql(ty, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::No));
        out.to_vec()
    }

    #[test]
    fn ints_narrow_to_column_type() {
        assert_eq!(encode(&Value::Int(7), &Type::INT4), 7i32.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT2), 7i16.to_be_bytes());
        let mut out = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT4, &mut out).is_err());
    }

    #[test]
    fn text_parses_into_typed_columns() {
        assert_eq!(
            encode(&Value::from("42"), &Type::INT8),
            42i64.to_be_bytes()
        );
        assert_eq!(encode(&Value::from("bob"), &Type::TEXT), b"bob");
        assert_eq!(encode(&Value::Int(5), &Type::VARCHAR), b"5");
    }

    #[test]
    fn null_is_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::INT4, &mut out).unwrap(),
            IsNull::Yes
        ));
        assert_eq!(Value::from_sql_null(&Type::INT4).unwrap(), Value::Null);
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(
            Value::from_sql(&Type::INT4, &9i32.to_be_bytes()).unwrap(),
            Value::Int(9)
        );
        assert_eq!(Value::from_sql(&Type::TEXT, b"hi").unwrap(), Value::from("hi"));
        assert_eq!(Value::from_sql(&Type::BOOL, &[1]).unwrap(), Value::Int(1));
    }
}
