use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WarehouseError;
use crate::wire;

// ── Cell values ──────────────────────────────────────────────────

/// A single decoded BigQuery cell.
///
/// Serializes to the natural JSON form (`null`, `true`, `1`, `1.5`, `"a"`,
/// arrays and objects), so a [`Record`] serializes as a plain JSON object.
/// Non-finite floats use BigQuery's spellings `"NaN"`, `"Infinity"` and
/// `"-Infinity"`; JSON has no number for them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// A REPEATED column.
    List(Vec<CellValue>),
    /// A RECORD/STRUCT column, fields in schema order.
    Struct(IndexMap<String, CellValue>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Textual form used for CSV fields.
    ///
    /// Nulls become the empty string, integral floats keep a trailing `.0`,
    /// and nested values are compact JSON so the encoding is stable across runs.
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => format_float(*f),
            CellValue::Text(s) => s.clone(),
            CellValue::List(_) | CellValue::Struct(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            CellValue::Float(f) => serializer.serialize_str(non_finite_name(*f)),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::List(items) => items.serialize(serializer),
            CellValue::Struct(fields) => fields.serialize(serializer),
        }
    }
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn format_float(f: f64) -> String {
    if !f.is_finite() {
        non_finite_name(f).to_string()
    } else if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv_field())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// One result row: column name → value, in result-schema order.
pub type Record = IndexMap<String, CellValue>;

// ── Schema ───────────────────────────────────────────────────────

/// Column metadata as reported by BigQuery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    /// BigQuery type name ("STRING", "INTEGER", "RECORD", ...).
    #[serde(rename = "type")]
    pub field_type: String,
    /// "NULLABLE", "REQUIRED" or "REPEATED".
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sub-fields of a RECORD column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    /// A NULLABLE scalar column.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: "NULLABLE".to_string(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_fields(mut self, fields: Vec<SchemaField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.mode.eq_ignore_ascii_case("REPEATED")
    }
}

impl From<wire::TableFieldSchema> for SchemaField {
    fn from(f: wire::TableFieldSchema) -> Self {
        Self {
            name: f.name,
            field_type: f.field_type.to_uppercase(),
            mode: f
                .mode
                .map(|m| m.to_uppercase())
                .unwrap_or_else(|| "NULLABLE".to_string()),
            description: f.description.filter(|d| !d.is_empty()),
            fields: f.fields.into_iter().map(SchemaField::from).collect(),
        }
    }
}

// ── Query results ────────────────────────────────────────────────

/// Fully materialized result of one query execution.
///
/// Every record holds the columns in `columns` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<SchemaField>,
    pub rows: Vec<Record>,
}

impl QueryResult {
    pub fn new(columns: Vec<SchemaField>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Value at `row` / `column`, `None` if either is out of range.
    pub fn get_value(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row)?.get(column)
    }
}

// ── Tables ───────────────────────────────────────────────────────

/// A `dataset.table` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableDescriptor {
    pub dataset: String,
    pub table: String,
}

impl TableDescriptor {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Parse `dataset.table`. Exactly one `.` with non-empty sides.
    pub fn parse(name: &str) -> Result<Self, WarehouseError> {
        let mut parts = name.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(dataset), Some(table), None)
                if !dataset.trim().is_empty() && !table.trim().is_empty() =>
            {
                Ok(Self::new(dataset.trim(), table.trim()))
            }
            _ => Err(WarehouseError::InvalidName(name.to_string())),
        }
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

impl FromStr for TableDescriptor {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TableDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TableDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Schema and DDL of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub table: TableDescriptor,
    pub fields: Vec<SchemaField>,
    /// `CREATE TABLE` statement, when the catalog has one.
    pub ddl: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_floats_keep_their_names() {
        let mut row = Record::new();
        row.insert("nan".into(), CellValue::Float(f64::NAN));
        row.insert("pos".into(), CellValue::Float(f64::INFINITY));
        row.insert("neg".into(), CellValue::Float(f64::NEG_INFINITY));
        row.insert("none".into(), CellValue::Null);

        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"nan":"NaN","pos":"Infinity","neg":"-Infinity","none":null}"#
        );
        let fields: Vec<String> = row.values().map(CellValue::to_csv_field).collect();
        assert_eq!(fields, vec!["NaN", "Infinity", "-Infinity", ""]);
    }

    #[test]
    fn nested_non_finite_float_is_named() {
        let list = CellValue::List(vec![CellValue::Float(1.5), CellValue::Float(f64::NAN)]);
        assert_eq!(list.to_csv_field(), r#"[1.5,"NaN"]"#);
    }

    #[test]
    fn record_serializes_as_plain_object() {
        let mut row = Record::new();
        row.insert("x".into(), CellValue::Integer(1));
        row.insert("name".into(), CellValue::from("ada"));
        row.insert("missing".into(), CellValue::Null);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"x":1,"name":"ada","missing":null}"#);
    }

    #[test]
    fn csv_field_rendering() {
        assert_eq!(CellValue::Null.to_csv_field(), "");
        assert_eq!(CellValue::Bool(true).to_csv_field(), "true");
        assert_eq!(CellValue::Integer(-42).to_csv_field(), "-42");
        assert_eq!(CellValue::Float(1.0).to_csv_field(), "1.0");
        assert_eq!(CellValue::Float(2.5).to_csv_field(), "2.5");
        assert_eq!(CellValue::from("a,b").to_csv_field(), "a,b");

        let list = CellValue::List(vec![CellValue::Integer(1), CellValue::from("two")]);
        assert_eq!(list.to_csv_field(), r#"[1,"two"]"#);

        let mut inner = IndexMap::new();
        inner.insert("b".to_string(), CellValue::Integer(2));
        inner.insert("a".to_string(), CellValue::Null);
        assert_eq!(CellValue::Struct(inner).to_csv_field(), r#"{"b":2,"a":null}"#);
    }

    #[test]
    fn descriptor_parses_exactly_one_separator() {
        let t = TableDescriptor::parse("sales.orders").unwrap();
        assert_eq!(t.dataset, "sales");
        assert_eq!(t.table, "orders");
        assert_eq!(t.to_string(), "sales.orders");

        for bad in ["a", "a.b.c", ".b", "a.", "", "."] {
            let err = TableDescriptor::parse(bad).unwrap_err();
            assert!(matches!(err, WarehouseError::InvalidName(_)), "{bad}");
        }
    }

    #[test]
    fn descriptor_serializes_as_string() {
        let t = TableDescriptor::new("sales", "orders");
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""sales.orders""#);
        let back: TableDescriptor = serde_json::from_str(r#""sales.orders""#).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<TableDescriptor>(r#""nodot""#).is_err());
    }

    #[test]
    fn schema_field_from_wire_defaults_mode() {
        let wire = wire::TableFieldSchema {
            name: "address".into(),
            field_type: "record".into(),
            mode: None,
            description: Some(String::new()),
            fields: vec![wire::TableFieldSchema {
                name: "city".into(),
                field_type: "STRING".into(),
                mode: Some("required".into()),
                description: Some("City name".into()),
                fields: Vec::new(),
            }],
        };
        let field = SchemaField::from(wire);
        assert_eq!(field.field_type, "RECORD");
        assert_eq!(field.mode, "NULLABLE");
        assert!(field.description.is_none());
        assert_eq!(field.fields[0].mode, "REQUIRED");
        assert_eq!(field.fields[0].description.as_deref(), Some("City name"));
    }

    #[test]
    fn query_result_accessors() {
        let mut row = Record::new();
        row.insert("x".into(), CellValue::Integer(7));
        let result = QueryResult::new(vec![SchemaField::new("x", "INTEGER")], vec![row]);

        assert_eq!(result.row_count(), 1);
        assert!(!result.is_empty());
        assert_eq!(result.column_names(), vec!["x"]);
        assert_eq!(result.get_value(0, "x"), Some(&CellValue::Integer(7)));
        assert_eq!(result.get_value(1, "x"), None);
        assert_eq!(result.get_value(0, "y"), None);
    }
}
