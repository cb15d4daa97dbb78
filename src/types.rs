//! Core data model types.
//!
//! Every ingested budget file ends up in a [`DataSet`]: an ordered [`Schema`] of typed [`Field`]s
//! plus row-major [`Value`] storage. The unified table handed to callers is a `DataSet` whose
//! schema always contains the [`columns::REQUIRED`] columns and [`columns::DIFFERENCE`].

use std::fmt;

/// Well-known column names of a local-body budget table.
pub mod columns {
    /// Unique project identifier.
    pub const CODE: &str = "Code";
    /// Local-body category.
    pub const LB_TYPE: &str = "LBType";
    /// Total allocated income/budget.
    pub const TOT: &str = "Tot";
    /// Total recorded expenditure.
    pub const TOT_EXP: &str = "TotExp";
    /// Project sector.
    pub const SECTOR: &str = "Sector";
    /// District the project belongs to.
    pub const DISTRICT: &str = "District";
    /// Derived `Tot - TotExp`.
    pub const DIFFERENCE: &str = "Difference";
    /// Derived by the funding-status analysis.
    pub const FUNDING_STATUS: &str = "Funding Status";

    /// Columns every source file must carry, in canonical order.
    pub const REQUIRED: [&str; 6] = [CODE, LB_TYPE, TOT, TOT_EXP, SECTOR, DISTRICT];
}

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// The narrowest type able to hold values of both `self` and `other`.
    ///
    /// Integers widen to floats; any other disagreement falls back to [`DataType::Utf8`].
    pub fn widen(self, other: DataType) -> DataType {
        match (self, other) {
            (a, b) if a == b => a,
            (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
                DataType::Float64
            }
            _ => DataType::Utf8,
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// An ordered list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// The schema of a unified table built from zero files.
    pub fn canonical() -> Self {
        use columns::*;
        Self::new(vec![
            Field::new(CODE, DataType::Utf8),
            Field::new(LB_TYPE, DataType::Utf8),
            Field::new(TOT, DataType::Float64),
            Field::new(TOT_EXP, DataType::Float64),
            Field::new(SECTOR, DataType::Utf8),
            Field::new(DISTRICT, DataType::Utf8),
            Field::new(DIFFERENCE, DataType::Float64),
        ])
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Integers are widened; everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String view of a [`Value::Utf8`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

static NULL: Value = Value::Null;

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// An empty dataset with the canonical budget schema.
    pub fn empty() -> Self {
        Self::new(Schema::canonical(), Vec::new())
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    /// Iterate the values of one column, or `None` if the column does not exist.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + use<'a>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&NULL)))
    }

    /// The value at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Reduce (fold) all rows into an accumulator value.
    pub fn reduce_rows<A, F>(&self, init: A, mut reducer: F) -> A
    where
        F: FnMut(A, &[Value]) -> A,
    {
        self.rows
            .iter()
            .fold(init, |acc, row| reducer(acc, row.as_slice()))
    }

    /// Append a derived column computed from each row.
    pub fn with_column<F>(&self, field: Field, mut derive: F) -> Self
    where
        F: FnMut(&[Value]) -> Value,
    {
        let mut schema = self.schema.clone();
        schema.fields.push(field);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = row.clone();
                let v = derive(row.as_slice());
                out.push(v);
                out
            })
            .collect();
        Self { schema, rows }
    }

    /// Keep only the named columns, in the given order. Unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let idxs: Vec<usize> = names
            .iter()
            .filter_map(|n| self.schema.index_of(n))
            .collect();
        let schema = Schema::new(idxs.iter().map(|&i| self.schema.fields[i].clone()).collect());
        let rows = self
            .rows
            .iter()
            .map(|row| {
                idxs.iter()
                    .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { schema, rows }
    }
}
