//! Group-and-sum for [`crate::types::DataSet`].

use std::collections::BTreeMap;

use crate::error::{IngestionError, IngestionResult};
use crate::types::DataSet;

/// Sum `value_columns` per distinct value of `key`.
///
/// Groups come back sorted by key. Rows with a null key are skipped; null values count as zero.
/// Keys are compared by their text rendering, so `Int64(1)` and `Utf8("1")` share a group.
pub fn group_sum(
    dataset: &DataSet,
    key: &str,
    value_columns: &[&str],
) -> IngestionResult<Vec<(String, Vec<f64>)>> {
    let index = |name: &str| {
        dataset
            .schema
            .index_of(name)
            .ok_or_else(|| IngestionError::unknown_column(name))
    };
    let key_idx = index(key)?;
    let value_idxs = value_columns
        .iter()
        .map(|c| index(*c))
        .collect::<IngestionResult<Vec<_>>>()?;

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in &dataset.rows {
        let Some(k) = row.get(key_idx).filter(|v| !v.is_null()) else {
            continue;
        };
        let sums = groups
            .entry(k.to_string())
            .or_insert_with(|| vec![0.0; value_idxs.len()]);
        for (sum, &idx) in sums.iter_mut().zip(&value_idxs) {
            *sum += row.get(idx).and_then(|v| v.as_f64()).unwrap_or(0.0);
        }
    }

    Ok(groups.into_iter().collect())
}
