// ABOUTME: Binds engine-neutral values as PostgreSQL statement parameters
// ABOUTME: Adapts each value to the parameter type the server inferred for its target column

use crate::convert::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, Format, IsNull, Kind, ToSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} value to a {} parameter", value.kind(), ty).into()
}

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
        || matches!(ty.kind(), Kind::Enum(_))
}

fn is_json(ty: &Type) -> bool {
    matches!(*ty, Type::JSON | Type::JSONB)
}

/// Text encoding shared by text, enum and server-parsed parameters
fn write_text(s: &str, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    out.extend_from_slice(s.as_bytes());
    Ok(IsNull::No)
}

/// TIMETZ binary layout: microseconds since midnight, then the zone offset in seconds west of UTC
fn write_timetz(t: &NaiveTime, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let micros =
        i64::from(t.num_seconds_from_midnight()) * 1_000_000 + i64::from(t.nanosecond() / 1_000);
    out.extend_from_slice(&micros.to_be_bytes());
    out.extend_from_slice(&0i32.to_be_bytes());
    Ok(IsNull::No)
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),

            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 => i16::from(*b).to_sql(ty, out),
                Type::INT4 => i32::from(*b).to_sql(ty, out),
                Type::INT8 => i64::from(*b).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },

            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::BOOL if *i == 0 || *i == 1 => (*i == 1).to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ if is_text(ty) => write_text(&i.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },

            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*f)
                    .ok_or_else(|| format!("{} cannot be stored as NUMERIC", f))?
                    .to_sql(ty, out),
                _ if is_text(ty) => write_text(&f.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },

            Value::Decimal(d) => match *ty {
                Type::NUMERIC => d.to_sql(ty, out),
                Type::FLOAT8 => d
                    .to_f64()
                    .ok_or_else(|| format!("{} does not fit in FLOAT8", d))?
                    .to_sql(ty, out),
                Type::FLOAT4 => d
                    .to_f32()
                    .ok_or_else(|| format!("{} does not fit in FLOAT4", d))?
                    .to_sql(ty, out),
                Type::INT8 if d.fract().is_zero() => d
                    .to_i64()
                    .ok_or_else(|| format!("{} does not fit in INT8", d))?
                    .to_sql(ty, out),
                _ if is_text(ty) => write_text(&d.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },

            // Outside text and JSON columns the literal goes over in text format and the
            // server parses it (uuid, numeric, date, timestamp, ...)
            Value::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    let json: serde_json::Value = serde_json::from_str(s)?;
                    json.to_sql(ty, out)
                }
                _ => write_text(s, out),
            },

            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.to_sql(ty, out),
                _ if is_text(ty) => write_text(std::str::from_utf8(b)?, out),
                _ => Err(mismatch(self, ty)),
            },

            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                _ if is_text(ty) => write_text(&j.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },

            Value::Date(d) => match *ty {
                Type::DATE => d.to_sql(ty, out),
                Type::TIMESTAMP => d.and_time(NaiveTime::MIN).to_sql(ty, out),
                Type::TIMESTAMPTZ => {
                    DateTime::<Utc>::from_naive_utc_and_offset(d.and_time(NaiveTime::MIN), Utc)
                        .to_sql(ty, out)
                }
                _ if is_text(ty) => write_text(&d.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },

            Value::Time(t) => match *ty {
                Type::TIME => t.to_sql(ty, out),
                Type::TIMETZ => write_timetz(t, out),
                _ if is_text(ty) => write_text(&t.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },

            // MySQL DATETIME has no zone; it is taken as UTC for TIMESTAMPTZ columns
            Value::DateTime(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => DateTime::<Utc>::from_naive_utc_and_offset(*dt, Utc).to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ if is_text(ty) => write_text(&dt.to_string(), out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        match self {
            Value::Text(_) if !is_text(ty) && !is_json(ty) => Format::Text,
            _ => Format::Binary,
        }
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn encode(value: &Value, ty: &Type) -> Result<(IsNull, Vec<u8>), BoxError> {
        let mut buf = BytesMut::new();
        let is_null = value.to_sql(ty, &mut buf)?;
        Ok((is_null, buf.to_vec()))
    }

    #[test]
    fn test_null_binds_as_null() {
        let (is_null, buf) = encode(&Value::Null, &Type::INT4).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_int_narrows_to_column_width() {
        let (_, buf) = encode(&Value::Int(300), &Type::INT2).unwrap();
        assert_eq!(buf, 300i16.to_be_bytes());

        let (_, buf) = encode(&Value::Int(7), &Type::INT4).unwrap();
        assert_eq!(buf, 7i32.to_be_bytes());

        let (_, buf) = encode(&Value::Int(7), &Type::INT8).unwrap();
        assert_eq!(buf, 7i64.to_be_bytes());
    }

    #[test]
    fn test_int_overflow_is_error() {
        assert!(encode(&Value::Int(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn test_bool_encoding() {
        let (_, buf) = encode(&Value::Bool(true), &Type::BOOL).unwrap();
        assert_eq!(buf, vec![1]);
        // A 0/1 integer headed for a BOOL column still binds
        let (_, buf) = encode(&Value::Int(0), &Type::BOOL).unwrap();
        assert_eq!(buf, vec![0]);
        assert!(encode(&Value::Int(5), &Type::BOOL).is_err());
    }

    #[test]
    fn test_text_and_mismatch() {
        let (_, buf) = encode(&Value::Text("porter".into()), &Type::VARCHAR).unwrap();
        assert_eq!(buf, b"porter");
        assert!(matches!(
            Value::Text("porter".into()).encode_format(&Type::VARCHAR),
            Format::Binary
        ));

        let err = encode(&Value::Bytes(vec![1]), &Type::INT4)
            .err()
            .expect("bytes cannot bind to an integer");
        assert!(err.to_string().contains("bytes"));
    }

    #[test]
    fn test_text_literal_left_for_server_to_parse() {
        for ty in [Type::DATE, Type::UUID, Type::TIMESTAMP, Type::NUMERIC, Type::TIME] {
            let value = Value::Text("2024-01-01".into());
            let (_, buf) = encode(&value, &ty).unwrap();
            assert_eq!(buf, b"2024-01-01");
            assert!(matches!(value.encode_format(&ty), Format::Text));
        }
    }

    #[test]
    fn test_temporal_widening() {
        let date = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap();
        let (_, buf) = encode(&Value::Date(date), &Type::TIMESTAMP).unwrap();
        // Microseconds since 2000-01-01 00:00
        assert_eq!(buf, 86_400_000_000i64.to_be_bytes());
        let (_, buf) = encode(&Value::Date(date), &Type::TIMESTAMPTZ).unwrap();
        assert_eq!(buf, 86_400_000_000i64.to_be_bytes());

        let time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let (_, buf) = encode(&Value::Time(time), &Type::TIMETZ).unwrap();
        assert_eq!(&buf[..8], &28_800_000_000i64.to_be_bytes());
        assert_eq!(&buf[8..], &0i32.to_be_bytes());
    }

    #[test]
    fn test_date_encoding() {
        let date = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap();
        let (_, buf) = encode(&Value::Date(date), &Type::DATE).unwrap();
        // Days since 2000-01-01
        assert_eq!(buf, 1i32.to_be_bytes());
    }

    #[test]
    fn test_json_from_text() {
        let (_, buf) = encode(&Value::Text("{\"a\":1}".into()), &Type::JSONB).unwrap();
        // JSONB binary format: version byte then the document
        assert_eq!(buf[0], 1);
        assert_eq!(&buf[1..], b"{\"a\":1}");
    }
}
