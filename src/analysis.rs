//! Budget analyses over the unified table.
//!
//! Each function takes the [`DataSet`] produced by [`crate::ingestion`] and trusts its
//! contract (required columns present, `Tot`/`TotExp` numeric). Handing them a table without a
//! needed column yields [`IngestionError::UnknownColumn`].
//!
//! | View | Function |
//! |---|---|
//! | Filter by LBType | [`lb_types`], [`filter_by_lb_type`] |
//! | Funded vs not funded | [`with_funding_status`], [`funding_counts`], [`funding_overview`] |
//! | Total expense vs income | [`compare_totals`] |
//! | District-wise expense vs income | [`district_totals`] |
//! | Unused funds | [`unused_funds`] |

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{IngestionError, IngestionResult};
use crate::processing::{filter, filter_in, group_sum, sum_f64};
use crate::types::{columns, DataSet, DataType, Field, Value};

fn column_index(dataset: &DataSet, name: &str) -> IngestionResult<usize> {
    dataset
        .schema
        .index_of(name)
        .ok_or_else(|| IngestionError::unknown_column(name))
}

/// Distinct `LBType` values in order of first appearance. Nulls are skipped.
pub fn lb_types(dataset: &DataSet) -> IngestionResult<Vec<String>> {
    let idx = column_index(dataset, columns::LB_TYPE)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in &dataset.rows {
        match row.get(idx) {
            Some(Value::Null) | None => {}
            Some(v) => {
                let s = v.to_string();
                if seen.insert(s.clone()) {
                    out.push(s);
                }
            }
        }
    }
    Ok(out)
}

/// Rows whose `LBType` is one of `selected`. An empty selection keeps every row.
pub fn filter_by_lb_type<S: AsRef<str>>(dataset: &DataSet, selected: &[S]) -> IngestionResult<DataSet> {
    if selected.is_empty() {
        column_index(dataset, columns::LB_TYPE)?;
        return Ok(dataset.clone());
    }
    let allowed: Vec<Value> = selected
        .iter()
        .map(|s| Value::Utf8(s.as_ref().to_string()))
        .collect();
    filter_in(dataset, columns::LB_TYPE, &allowed)
}

/// Whether a project received any allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FundingStatus {
    /// Nonzero `Tot`.
    Funded,
    /// `Tot == 0`.
    NotFunded,
}

impl FundingStatus {
    /// Label used in the `Funding Status` column.
    pub fn label(self) -> &'static str {
        match self {
            FundingStatus::Funded => "Funded",
            FundingStatus::NotFunded => "Not Funded",
        }
    }
}

impl fmt::Display for FundingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a total allocation. Exactly zero is not funded; anything else, including negative
/// adjustments, is funded.
pub fn classify_funding(tot: f64) -> FundingStatus {
    if tot == 0.0 {
        FundingStatus::NotFunded
    } else {
        FundingStatus::Funded
    }
}

fn funding_of(row: &[Value], tot_idx: usize) -> Option<FundingStatus> {
    row.get(tot_idx).and_then(Value::as_f64).map(classify_funding)
}

/// The table with a `Funding Status` text column appended.
pub fn with_funding_status(dataset: &DataSet) -> IngestionResult<DataSet> {
    let tot_idx = column_index(dataset, columns::TOT)?;
    Ok(dataset.with_column(Field::new(columns::FUNDING_STATUS, DataType::Utf8), |row| {
        funding_of(row, tot_idx)
            .map(|s| Value::Utf8(s.label().to_string()))
            .unwrap_or(Value::Null)
    }))
}

/// Number of funded and not-funded projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FundingCounts {
    /// Projects with nonzero `Tot`.
    pub funded: usize,
    /// Projects with `Tot == 0`.
    pub not_funded: usize,
}

/// Count projects per [`FundingStatus`].
pub fn funding_counts(dataset: &DataSet) -> IngestionResult<FundingCounts> {
    let tot_idx = column_index(dataset, columns::TOT)?;
    Ok(dataset.reduce_rows(FundingCounts::default(), |mut acc, row| {
        match funding_of(row, tot_idx) {
            Some(FundingStatus::Funded) => acc.funded += 1,
            Some(FundingStatus::NotFunded) => acc.not_funded += 1,
            None => {}
        }
        acc
    }))
}

/// The funding table: `Code, LBType, Sector, District, Tot, Funding Status`.
pub fn funding_overview(dataset: &DataSet) -> IngestionResult<DataSet> {
    let with_status = with_funding_status(dataset)?;
    Ok(with_status.select(&[
        columns::CODE,
        columns::LB_TYPE,
        columns::SECTOR,
        columns::DISTRICT,
        columns::TOT,
        columns::FUNDING_STATUS,
    ]))
}

/// Grand totals of expenditure and income.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TotalsComparison {
    /// Sum of `TotExp`.
    pub total_expense: f64,
    /// Sum of `Tot`.
    pub total_income: f64,
}

impl TotalsComparison {
    /// `total_income - total_expense`.
    pub fn balance(&self) -> f64 {
        self.total_income - self.total_expense
    }
}

/// Sum `TotExp` and `Tot` over the whole table.
pub fn compare_totals(dataset: &DataSet) -> IngestionResult<TotalsComparison> {
    let total_expense = sum_f64(dataset, columns::TOT_EXP)
        .ok_or_else(|| IngestionError::unknown_column(columns::TOT_EXP))?;
    let total_income = sum_f64(dataset, columns::TOT)
        .ok_or_else(|| IngestionError::unknown_column(columns::TOT))?;
    Ok(TotalsComparison {
        total_expense,
        total_income,
    })
}

/// Expenditure and income of one district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTotals {
    /// District name.
    pub district: String,
    /// Sum of `TotExp`.
    pub total_expense: f64,
    /// Sum of `Tot`.
    pub total_income: f64,
}

/// Per-district sums of `TotExp` and `Tot`, sorted by district name.
pub fn district_totals(dataset: &DataSet) -> IngestionResult<Vec<DistrictTotals>> {
    let groups = group_sum(dataset, columns::DISTRICT, &[columns::TOT_EXP, columns::TOT])?;
    Ok(groups
        .into_iter()
        .map(|(district, sums)| DistrictTotals {
            district,
            total_expense: sums[0],
            total_income: sums[1],
        })
        .collect())
}

/// `true` for a project that was allocated funds but spent nothing.
pub fn is_unused_funds(tot: f64, tot_exp: f64) -> bool {
    tot_exp == 0.0 && tot > 0.0
}

/// Projects with `TotExp == 0` and `Tot > 0`.
pub fn unused_funds(dataset: &DataSet) -> IngestionResult<DataSet> {
    let tot_idx = column_index(dataset, columns::TOT)?;
    let exp_idx = column_index(dataset, columns::TOT_EXP)?;
    Ok(filter(dataset, |row| {
        match (
            row.get(tot_idx).and_then(Value::as_f64),
            row.get(exp_idx).and_then(Value::as_f64),
        ) {
            (Some(tot), Some(exp)) => is_unused_funds(tot, exp),
            _ => false,
        }
    }))
}
