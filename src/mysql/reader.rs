// ABOUTME: Decodes MySQL result rows into engine-neutral values by declared column type
// ABOUTME: Decode failures are errors, never silent NULLs

use crate::convert::Value;
use crate::error::{MigrateError, Result};
use crate::migration::SourceColumn;
use crate::utils::quote_mysql_ident;
use sqlx::mysql::MySqlRow;
use sqlx::{Row, ValueRef};

/// Lower-cased type name with an ` unsigned` suffix for unsigned integer columns
pub fn normalize_type(data_type: &str, column_type: &str) -> String {
    let data_type = data_type.trim().to_lowercase();
    if column_type.to_lowercase().contains("unsigned") && is_integer_type(&data_type) {
        format!("{} unsigned", data_type)
    } else {
        data_type
    }
}

fn is_integer_type(data_type: &str) -> bool {
    matches!(
        data_type,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint"
    )
}

/// `SELECT` listing every column explicitly so values line up with `columns`
pub fn select_all_sql(table: &str, columns: &[SourceColumn]) -> String {
    let col_list = columns
        .iter()
        .map(|c| quote_mysql_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", col_list, quote_mysql_ident(table))
}

/// Convert a MySQL row to values in `columns` order.
pub fn row_to_values(row: &MySqlRow, columns: &[SourceColumn], table: &str) -> Result<Vec<Value>> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            decode_value(row, idx, &column.data_type).map_err(|message| MigrateError::Conversion {
                table: table.to_string(),
                column: column.name.clone(),
                message,
            })
        })
        .collect()
}

fn decode_value(row: &MySqlRow, idx: usize, data_type: &str) -> std::result::Result<Value, String> {
    let is_null = row
        .try_get_raw(idx)
        .map(|raw| raw.is_null())
        .map_err(|e| e.to_string())?;
    if is_null {
        return Ok(Value::Null);
    }

    let unsigned = data_type.ends_with(" unsigned");
    let base = data_type.trim_end_matches(" unsigned");

    let value = match base {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" if unsigned => {
            let v = row.try_get::<u64, _>(idx).map_err(|e| e.to_string())?;
            let v = i64::try_from(v).map_err(|_| format!("unsigned value {} exceeds BIGINT range", v))?;
            Value::Int(v)
        }
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
            Value::Int(row.try_get::<i64, _>(idx).map_err(|e| e.to_string())?)
        }
        "year" => row
            .try_get::<i64, _>(idx)
            .or_else(|_| row.try_get::<u16, _>(idx).map(i64::from))
            .map(Value::Int)
            .map_err(|e| e.to_string())?,
        "bit" | "bool" | "boolean" => row
            .try_get::<bool, _>(idx)
            .map(Value::Bool)
            .or_else(|_| row.try_get::<u64, _>(idx).map(|v| Value::Int(v as i64)))
            .map_err(|e| e.to_string())?,

        "float" => Value::Float(f64::from(
            row.try_get::<f32, _>(idx).map_err(|e| e.to_string())?,
        )),
        "double" | "real" => Value::Float(row.try_get::<f64, _>(idx).map_err(|e| e.to_string())?),
        "decimal" | "numeric" => Value::Decimal(
            row.try_get::<rust_decimal::Decimal, _>(idx)
                .map_err(|e| e.to_string())?,
        ),

        "char" | "varchar" | "text" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set" => {
            Value::Text(row.try_get::<String, _>(idx).map_err(|e| e.to_string())?)
        }
        "json" => {
            let raw = row.try_get::<String, _>(idx).map_err(|e| e.to_string())?;
            match serde_json::from_str(&raw) {
                Ok(json) => Value::Json(json),
                Err(_) => Value::Text(raw),
            }
        }

        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
            Value::Bytes(row.try_get::<Vec<u8>, _>(idx).map_err(|e| e.to_string())?)
        }

        "date" => Value::Date(
            row.try_get::<chrono::NaiveDate, _>(idx)
                .map_err(|e| e.to_string())?,
        ),
        "time" => Value::Time(
            row.try_get::<chrono::NaiveTime, _>(idx)
                .map_err(|e| e.to_string())?,
        ),
        "datetime" | "timestamp" => Value::DateTime(
            row.try_get::<chrono::NaiveDateTime, _>(idx)
                .map_err(|e| e.to_string())?,
        ),

        // Anything else: text if it decodes as text, raw bytes otherwise
        other => row
            .try_get::<String, _>(idx)
            .map(Value::Text)
            .or_else(|_| row.try_get::<Vec<u8>, _>(idx).map(Value::Bytes))
            .map_err(|e| format!("unsupported MySQL type '{}': {}", other, e))?,
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("INT", "int(11)"), "int");
        assert_eq!(normalize_type("int", "int(10) unsigned"), "int unsigned");
        assert_eq!(normalize_type("tinyint", "tinyint(1)"), "tinyint");
        // unsigned only matters for integers
        assert_eq!(normalize_type("decimal", "decimal(5,2) unsigned"), "decimal");
        assert_eq!(
            normalize_type("enum", "enum('active','inactive')"),
            "enum"
        );
    }

    #[test]
    fn test_select_all_sql_keeps_column_order() {
        let columns = vec![
            SourceColumn::new("id", "int"),
            SourceColumn::new("type", "enum"),
            SourceColumn::new("name", "varchar"),
        ];
        assert_eq!(
            select_all_sql("shifts", &columns),
            "SELECT `id`, `type`, `name` FROM `shifts`"
        );
    }
}
