//! Conversion between BigQuery REST payloads and the crate's value model.
//!
//! # Type Mapping
//!
//! REST cells arrive as strings inside `{"v": …}` wrappers. Cells are
//! decoded by their schema type:
//! - `INTEGER`, `INT64` → `Integer`
//! - `FLOAT`, `FLOAT64` → `Float`
//! - `BOOLEAN`, `BOOL` → `Bool`
//! - `TIMESTAMP` → `Text` (RFC 3339, UTC, microsecond precision)
//! - `RECORD`, `STRUCT` → `Struct` (recursively decoded)
//! - mode `REPEATED` → `List` of the element type
//! - everything else (`STRING`, `NUMERIC`, `DATE`, `BYTES`, `JSON`, ...) → `Text` verbatim
//!
//! JSON `null` always decodes to `Null`.

use chrono::{DateTime, SecondsFormat};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::WarehouseError;
use crate::result::{CellValue, Record, SchemaField};
use crate::wire;

// ── Rows ─────────────────────────────────────────────────────────

/// Decode REST rows into records keyed by `fields` names.
pub fn decode_rows(
    fields: &[SchemaField],
    rows: Vec<wire::TableRow>,
) -> Result<Vec<Record>, WarehouseError> {
    rows.into_iter().map(|row| decode_row(fields, row)).collect()
}

/// Decode a single REST row. Missing trailing cells decode as `Null`.
pub fn decode_row(fields: &[SchemaField], row: wire::TableRow) -> Result<Record, WarehouseError> {
    if row.cells.len() > fields.len() {
        return Err(WarehouseError::Decode(format!(
            "row has {} cells but schema has {} fields",
            row.cells.len(),
            fields.len()
        )));
    }

    let mut cells = row.cells.into_iter();
    let mut record = Record::with_capacity(fields.len());
    for field in fields {
        let value = match cells.next() {
            Some(cell) => decode_value(field, &cell.value)?,
            None => CellValue::Null,
        };
        record.insert(field.name.clone(), value);
    }
    Ok(record)
}

fn decode_value(field: &SchemaField, value: &Value) -> Result<CellValue, WarehouseError> {
    if value.is_null() {
        return Ok(CellValue::Null);
    }

    if field.is_repeated() {
        let items = value.as_array().ok_or_else(|| {
            WarehouseError::Decode(format!("REPEATED field '{}' is not an array", field.name))
        })?;
        return items
            .iter()
            .map(|item| decode_scalar(field, unwrap_cell(item)))
            .collect::<Result<Vec<_>, _>>()
            .map(CellValue::List);
    }

    decode_scalar(field, value)
}

/// Array elements are wrapped as `{"v": …}`; bare values pass through.
fn unwrap_cell(item: &Value) -> &Value {
    item.get("v").unwrap_or(item)
}

fn decode_scalar(field: &SchemaField, value: &Value) -> Result<CellValue, WarehouseError> {
    if value.is_null() {
        return Ok(CellValue::Null);
    }

    match field.field_type.as_str() {
        "RECORD" | "STRUCT" => decode_struct(field, value),
        "INTEGER" | "INT64" => {
            let text = scalar_text(value);
            text.parse::<i64>()
                .map(CellValue::Integer)
                .map_err(|_| type_error(field, &text))
        }
        "FLOAT" | "FLOAT64" => {
            let text = scalar_text(value);
            text.parse::<f64>()
                .map(CellValue::Float)
                .map_err(|_| type_error(field, &text))
        }
        "BOOLEAN" | "BOOL" => match scalar_text(value).to_ascii_lowercase().as_str() {
            "true" => Ok(CellValue::Bool(true)),
            "false" => Ok(CellValue::Bool(false)),
            other => Err(type_error(field, other)),
        },
        "TIMESTAMP" => {
            let text = scalar_text(value);
            parse_timestamp(&text)
                .map(CellValue::Text)
                .ok_or_else(|| type_error(field, &text))
        }
        _ => Ok(CellValue::Text(scalar_text(value))),
    }
}

fn decode_struct(field: &SchemaField, value: &Value) -> Result<CellValue, WarehouseError> {
    let cells = value
        .get("f")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            WarehouseError::Decode(format!("RECORD field '{}' has no 'f' cells", field.name))
        })?;

    let mut out = IndexMap::with_capacity(field.fields.len());
    for (i, sub) in field.fields.iter().enumerate() {
        let cell = cells.get(i).map(unwrap_cell).unwrap_or(&Value::Null);
        out.insert(sub.name.clone(), decode_value(sub, cell)?);
    }
    Ok(CellValue::Struct(out))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_error(field: &SchemaField, raw: &str) -> WarehouseError {
    WarehouseError::Decode(format!(
        "cannot decode '{raw}' as {} for field '{}'",
        field.field_type, field.name
    ))
}

/// TIMESTAMP cells come back as integer microseconds (`useInt64Timestamp`)
/// or as float seconds ("1.6488238411870E9").
fn parse_timestamp(raw: &str) -> Option<String> {
    let micros = match raw.parse::<i64>() {
        Ok(m) => m,
        Err(_) => {
            let secs = raw.parse::<f64>().ok()?;
            (secs * 1_000_000.0).round() as i64
        }
    };
    DateTime::from_timestamp_micros(micros).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
}

// ── Query parameters ─────────────────────────────────────────────

/// A named query parameter (`@name` in SQL).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    /// BigQuery scalar type ("INT64", "FLOAT64", "BOOL", "STRING").
    pub type_name: &'static str,
    pub value: String,
}

impl QueryParameter {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: "STRING",
            value: value.into(),
        }
    }

    /// Infer the parameter type from a JSON value: integers → INT64,
    /// other numbers → FLOAT64, booleans → BOOL, anything else → STRING.
    /// Non-string values that fall back to STRING are compact JSON.
    pub fn infer(name: impl Into<String>, value: &Value) -> Self {
        let name = name.into();
        match value {
            Value::Bool(b) => Self {
                name,
                type_name: "BOOL",
                value: b.to_string(),
            },
            Value::Number(n) if n.as_i64().is_some() => Self {
                name,
                type_name: "INT64",
                value: n.to_string(),
            },
            Value::Number(n) => Self {
                name,
                type_name: "FLOAT64",
                value: n.to_string(),
            },
            Value::String(s) => Self::string(name, s.clone()),
            other => Self::string(name, other.to_string()),
        }
    }

    /// Infer every entry of a JSON object, preserving key order.
    pub fn from_map(map: &Map<String, Value>) -> Vec<Self> {
        map.iter().map(|(k, v)| Self::infer(k.clone(), v)).collect()
    }

    pub(crate) fn to_wire(&self) -> wire::QueryParameterBody {
        wire::QueryParameterBody {
            name: self.name.clone(),
            parameter_type: wire::ParameterType {
                type_name: self.type_name.to_string(),
            },
            parameter_value: wire::ParameterValue {
                value: self.value.clone(),
            },
        }
    }
}
