//! Row filtering for [`crate::types::DataSet`].

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Value};

/// Returns a new [`DataSet`] containing only rows for which `predicate` returns `true`.
///
/// This is a convenience wrapper around [`DataSet::filter_rows`].
pub fn filter<F>(dataset: &DataSet, predicate: F) -> DataSet
where
    F: FnMut(&[Value]) -> bool,
{
    dataset.filter_rows(predicate)
}

/// Keep rows whose `column` value equals one of `allowed`.
///
/// Nulls never match. Errors if the column does not exist.
pub fn filter_in(dataset: &DataSet, column: &str, allowed: &[Value]) -> IngestionResult<DataSet> {
    let idx = dataset
        .schema
        .index_of(column)
        .ok_or_else(|| IngestionError::unknown_column(column))?;
    Ok(dataset.filter_rows(|row| match row.get(idx) {
        Some(Value::Null) | None => false,
        Some(v) => allowed.contains(v),
    }))
}
