//! Reduction operations for [`crate::types::DataSet`].

use crate::types::{DataSet, DataType, Value};

/// Built-in reduction operations over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Count all rows (including nulls).
    Count,
    /// Sum numeric values, ignoring nulls.
    Sum,
    /// Minimum numeric value, ignoring nulls.
    Min,
    /// Maximum numeric value, ignoring nulls.
    Max,
}

impl ReduceOp {
    fn fold_i64(self, acc: Option<i64>, v: i64) -> i64 {
        match (self, acc) {
            (_, None) => v,
            (ReduceOp::Min, Some(a)) => a.min(v),
            (ReduceOp::Max, Some(a)) => a.max(v),
            (_, Some(a)) => a.saturating_add(v),
        }
    }

    fn fold_f64(self, acc: Option<f64>, v: f64) -> f64 {
        match (self, acc) {
            (_, None) => v,
            (ReduceOp::Min, Some(a)) => a.min(v),
            (ReduceOp::Max, Some(a)) => a.max(v),
            (_, Some(a)) => a + v,
        }
    }
}

/// Reduce a column using a built-in [`ReduceOp`].
///
/// - Returns `None` if `column` does not exist in the schema.
/// - For `Sum`/`Min`/`Max`, returns `Some(Value::Null)` if there are no non-null values or the
///   column is not numeric.
/// - For `Count`, always returns `Some(Value::Int64(row_count))`.
pub fn reduce(dataset: &DataSet, column: &str, op: ReduceOp) -> Option<Value> {
    let idx = dataset.schema.index_of(column)?;
    let data_type = dataset.schema.fields.get(idx)?.data_type;

    let out = match (op, data_type) {
        (ReduceOp::Count, _) => Value::Int64(dataset.row_count() as i64),
        (_, DataType::Int64) => dataset
            .reduce_rows(None, |acc, row| match row.get(idx) {
                Some(Value::Int64(v)) => Some(op.fold_i64(acc, *v)),
                _ => acc,
            })
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        (_, DataType::Float64) => dataset
            .reduce_rows(None, |acc, row| match row.get(idx) {
                Some(Value::Float64(v)) => Some(op.fold_f64(acc, *v)),
                _ => acc,
            })
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    };
    Some(out)
}

/// Sum of a numeric column as `f64`, treating an empty or all-null column as `0.0`.
///
/// Returns `None` if the column does not exist.
pub fn sum_f64(dataset: &DataSet, column: &str) -> Option<f64> {
    match reduce(dataset, column, ReduceOp::Sum)? {
        Value::Null => Some(0.0),
        v => v.as_f64(),
    }
}
