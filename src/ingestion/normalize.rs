//! Schema enforcement and cleaning of a decoded table.
//!
//! Turns a [`DecodedTable`] into a typed [`DataSet`]:
//!
//! 1. every [`columns::REQUIRED`] column must be present (all missing names are reported)
//! 2. rows with a null/blank `Code` are dropped
//! 3. `Tot`/`TotExp` are coerced to `Float64` and `Difference = Tot - TotExp` is appended
//!
//! Extra columns pass through with a type inferred from their cells.

use crate::error::{IngestionError, IngestionResult};
use crate::types::{columns, DataSet, DataType, Field, Schema, Value};

use super::decode::{DecodedRow, DecodedTable};

/// Outcome of normalizing one decoded table.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Cleaned rows with the `Difference` column appended.
    pub dataset: DataSet,
    /// Number of rows dropped for lacking a `Code`.
    pub dropped_rows: usize,
}

/// Required columns absent from `headers`, in canonical order.
pub fn missing_required_columns(headers: &[String]) -> Vec<String> {
    columns::REQUIRED
        .iter()
        .filter(|req| !headers.iter().any(|h| h == *req))
        .map(|req| req.to_string())
        .collect()
}

/// Validate, clean and augment one decoded table.
pub fn normalize(table: &DecodedTable) -> IngestionResult<Normalized> {
    let missing = missing_required_columns(&table.headers);
    if !missing.is_empty() {
        return Err(IngestionError::SchemaMismatch {
            file: table.source.clone(),
            missing,
        });
    }

    let code_idx = header_index(table, columns::CODE)?;
    let tot_idx = header_index(table, columns::TOT)?;
    let tot_exp_idx = header_index(table, columns::TOT_EXP)?;

    let mut kept: Vec<&DecodedRow> = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if code_text(&row.cells[code_idx]).is_some() {
            kept.push(row);
        }
    }
    let dropped_rows = table.rows.len() - kept.len();

    // A source column already named `Difference` is recomputed in place.
    let diff_idx = table.headers.iter().position(|h| h == columns::DIFFERENCE);
    let mut fields: Vec<Field> = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| Field::new(name.clone(), column_type(name, idx, &kept)))
        .collect();
    if diff_idx.is_none() {
        fields.push(Field::new(columns::DIFFERENCE, DataType::Float64));
    }
    let schema = Schema::new(fields);

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(kept.len());
    for row in kept {
        let tot = numeric_cell(table, row, columns::TOT, tot_idx)?;
        let tot_exp = numeric_cell(table, row, columns::TOT_EXP, tot_exp_idx)?;

        let mut out: Vec<Value> = Vec::with_capacity(schema.len());
        for (idx, field) in schema.fields.iter().take(table.headers.len()).enumerate() {
            let value = if idx == code_idx {
                code_text(&row.cells[idx]).map(Value::Utf8).unwrap_or(Value::Null)
            } else if idx == tot_idx {
                Value::Float64(tot)
            } else if idx == tot_exp_idx {
                Value::Float64(tot_exp)
            } else if Some(idx) == diff_idx {
                Value::Float64(tot - tot_exp)
            } else {
                coerce(&row.cells[idx], field.data_type)
            };
            out.push(value);
        }
        if diff_idx.is_none() {
            out.push(Value::Float64(tot - tot_exp));
        }
        rows.push(out);
    }

    Ok(Normalized {
        dataset: DataSet::new(schema, rows),
        dropped_rows,
    })
}

/// Convert `value` into `target`. Callers only ask for types the value is compatible with
/// (see [`infer_type`]); anything else is rendered as text.
pub(crate) fn coerce(value: &Value, target: DataType) -> Value {
    match (value, target) {
        (Value::Null, _) => Value::Null,
        (Value::Int64(v), DataType::Float64) => Value::Float64(*v as f64),
        (Value::Utf8(s), DataType::Int64) => s.parse().map(Value::Int64).unwrap_or(Value::Null),
        (Value::Utf8(s), DataType::Float64) => s.parse().map(Value::Float64).unwrap_or(Value::Null),
        (Value::Utf8(s), DataType::Bool) => parse_bool_literal(s).map(Value::Bool).unwrap_or(Value::Null),
        (Value::Int64(_), DataType::Int64)
        | (Value::Float64(_), DataType::Float64)
        | (Value::Bool(_), DataType::Bool)
        | (Value::Utf8(_), DataType::Utf8) => value.clone(),
        (other, _) => Value::Utf8(other.to_string()),
    }
}

/// The narrowest type holding every non-null value, or `None` when all values are null.
pub(crate) fn infer_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<DataType> {
    values
        .into_iter()
        .filter_map(cell_type)
        .reduce(DataType::widen)
}

fn cell_type(value: &Value) -> Option<DataType> {
    match value {
        Value::Null => None,
        Value::Int64(_) => Some(DataType::Int64),
        Value::Float64(_) => Some(DataType::Float64),
        Value::Bool(_) => Some(DataType::Bool),
        Value::Utf8(s) => Some(if s.parse::<i64>().is_ok() {
            DataType::Int64
        } else if s.parse::<f64>().is_ok_and(f64::is_finite) {
            DataType::Float64
        } else if parse_bool_literal(s).is_some() {
            DataType::Bool
        } else {
            DataType::Utf8
        }),
    }
}

fn parse_bool_literal(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn column_type(name: &str, idx: usize, rows: &[&DecodedRow]) -> DataType {
    match name {
        columns::TOT | columns::TOT_EXP | columns::DIFFERENCE => DataType::Float64,
        columns::CODE | columns::LB_TYPE | columns::SECTOR | columns::DISTRICT => DataType::Utf8,
        _ => infer_type(rows.iter().map(|r| &r.cells[idx])).unwrap_or(DataType::Utf8),
    }
}

fn header_index(table: &DecodedTable, name: &str) -> IngestionResult<usize> {
    table
        .headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| IngestionError::SchemaMismatch {
            file: table.source.clone(),
            missing: vec![name.to_string()],
        })
}

/// Text form of a `Code` cell, or `None` if the row has no usable identifier.
fn code_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Utf8(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn numeric_cell(
    table: &DecodedTable,
    row: &DecodedRow,
    column: &str,
    idx: usize,
) -> IngestionResult<f64> {
    let cell = &row.cells[idx];
    let type_error = |message: &str| IngestionError::Type {
        file: table.source.clone(),
        column: column.to_string(),
        row: row.source_row,
        raw: cell.to_string(),
        message: message.to_string(),
    };

    let v = match cell {
        Value::Float64(v) => *v,
        Value::Int64(v) => *v as f64,
        Value::Utf8(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| type_error(&format!("expected number: {e}")))?,
        Value::Bool(_) => return Err(type_error("expected number, got bool")),
        Value::Null => return Err(type_error("missing value")),
    };
    if !v.is_finite() {
        return Err(type_error("expected a finite number"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn table(headers: &[&str], rows: Vec<Vec<Value>>) -> DecodedTable {
        let mut t = DecodedTable::new("t.csv", headers.iter().map(|h| h.to_string()).collect());
        for (i, r) in rows.into_iter().enumerate() {
            t.push_row(i + 2, r).unwrap();
        }
        t
    }

    const HEADERS: [&str; 6] = ["Code", "LBType", "Tot", "TotExp", "Sector", "District"];

    #[test]
    fn reports_every_missing_column_in_canonical_order() {
        let headers: Vec<String> = ["District", "Code", "Tot"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            missing_required_columns(&headers),
            vec!["LBType", "TotExp", "Sector"]
        );
    }

    #[test]
    fn missing_sector_is_a_schema_error() {
        let t = table(&["Code", "LBType", "Tot", "TotExp", "District"], vec![]);
        match normalize(&t).unwrap_err() {
            IngestionError::SchemaMismatch { file, missing } => {
                assert_eq!(file, "t.csv");
                assert_eq!(missing, vec!["Sector"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn drops_blank_codes_and_derives_difference() {
        let t = table(
            &HEADERS,
            vec![
                vec![utf8("1"), utf8("X"), utf8("100"), utf8("80"), utf8("S1"), utf8("D1")],
                vec![Value::Null, utf8("X"), utf8("5"), utf8("1"), utf8("S1"), utf8("D1")],
                vec![utf8("2"), utf8("Y"), utf8("50"), utf8("75.5"), utf8("S2"), utf8("D2")],
            ],
        );
        let out = normalize(&t).unwrap();
        assert_eq!(out.dropped_rows, 1);
        assert_eq!(out.dataset.row_count(), 2);
        assert_eq!(out.dataset.value(0, "Difference"), Some(&Value::Float64(20.0)));
        assert_eq!(out.dataset.value(1, "Difference"), Some(&Value::Float64(-25.5)));
        assert_eq!(out.dataset.value(1, "Code"), Some(&utf8("2")));
    }

    #[test]
    fn numeric_codes_render_as_text() {
        let t = table(
            &HEADERS,
            vec![vec![
                Value::Float64(101.0),
                utf8("X"),
                Value::Int64(3),
                Value::Float64(1.5),
                utf8("S"),
                utf8("D"),
            ]],
        );
        let out = normalize(&t).unwrap();
        assert_eq!(out.dataset.value(0, "Code"), Some(&utf8("101")));
        assert_eq!(out.dataset.value(0, "Tot"), Some(&Value::Float64(3.0)));
        assert_eq!(out.dataset.value(0, "Difference"), Some(&Value::Float64(1.5)));
    }

    #[test]
    fn non_numeric_tot_is_a_type_error() {
        let t = table(
            &HEADERS,
            vec![vec![utf8("1"), utf8("X"), utf8("lots"), utf8("1"), utf8("S"), utf8("D")]],
        );
        match normalize(&t).unwrap_err() {
            IngestionError::Type { file, column, row, raw, .. } => {
                assert_eq!(file, "t.csv");
                assert_eq!(column, "Tot");
                assert_eq!(row, 2);
                assert_eq!(raw, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn null_tot_exp_on_kept_row_is_a_type_error() {
        let t = table(
            &HEADERS,
            vec![vec![utf8("1"), utf8("X"), utf8("10"), Value::Null, utf8("S"), utf8("D")]],
        );
        let err = normalize(&t).unwrap_err();
        assert!(matches!(err, IngestionError::Type { ref column, .. } if column == "TotExp"));
    }

    #[test]
    fn bool_tot_is_a_type_error() {
        let t = table(
            &HEADERS,
            vec![
                vec![utf8("1"), utf8("X"), utf8("1"), utf8("1"), utf8("S"), utf8("D")],
                vec![utf8("2"), utf8("X"), Value::Bool(true), utf8("1"), utf8("S"), utf8("D")],
            ],
        );
        match normalize(&t).unwrap_err() {
            IngestionError::Type { column, row, raw, message, .. } => {
                assert_eq!(column, "Tot");
                assert_eq!(row, 3);
                assert_eq!(raw, "true");
                assert_eq!(message, "expected number, got bool");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_numbers_are_type_errors() {
        for (tot, exp, column) in [
            (utf8("inf"), utf8("1"), "Tot"),
            (utf8("1"), utf8("-Infinity"), "TotExp"),
            (Value::Float64(f64::NAN), utf8("1"), "Tot"),
        ] {
            let t = table(&HEADERS, vec![vec![utf8("1"), utf8("X"), tot, exp, utf8("S"), utf8("D")]]);
            match normalize(&t).unwrap_err() {
                IngestionError::Type { column: got, row, message, .. } => {
                    assert_eq!(got, column);
                    assert_eq!(row, 2);
                    assert_eq!(message, "expected a finite number");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn bad_numbers_on_dropped_rows_are_ignored() {
        let t = table(
            &HEADERS,
            vec![vec![Value::Null, utf8("X"), utf8("n/a"), utf8("n/a"), utf8("S"), utf8("D")]],
        );
        let out = normalize(&t).unwrap();
        assert_eq!(out.dataset.row_count(), 0);
        assert_eq!(out.dropped_rows, 1);
    }

    #[test]
    fn extra_columns_pass_through_with_inferred_types() {
        let t = table(
            &["Code", "LBType", "Tot", "TotExp", "Sector", "District", "Year", "Note"],
            vec![
                vec![utf8("1"), utf8("X"), utf8("1"), utf8("1"), utf8("S"), utf8("D"), utf8("2023"), utf8("ok")],
                vec![utf8("2"), utf8("X"), utf8("1"), utf8("1"), utf8("S"), utf8("D"), utf8("2024"), Value::Null],
            ],
        );
        let out = normalize(&t).unwrap();
        let names: Vec<&str> = out.dataset.schema.field_names().collect();
        assert_eq!(names.last(), Some(&"Difference"));
        let year = out.dataset.schema.index_of("Year").unwrap();
        assert_eq!(out.dataset.schema.fields[year].data_type, DataType::Int64);
        assert_eq!(out.dataset.value(1, "Year"), Some(&Value::Int64(2024)));
        assert_eq!(out.dataset.value(0, "Note"), Some(&utf8("ok")));
        assert_eq!(out.dataset.value(1, "Note"), Some(&Value::Null));
    }

    #[test]
    fn existing_difference_column_is_recomputed() {
        let t = table(
            &["Code", "LBType", "Tot", "TotExp", "Difference", "Sector", "District"],
            vec![vec![utf8("1"), utf8("X"), utf8("9"), utf8("4"), utf8("999"), utf8("S"), utf8("D")]],
        );
        let out = normalize(&t).unwrap();
        assert_eq!(out.dataset.column_count(), 7);
        assert_eq!(out.dataset.value(0, "Difference"), Some(&Value::Float64(5.0)));
    }

    #[test]
    fn infer_type_widens() {
        let vals = [Value::Int64(1), utf8("2.5"), Value::Null];
        assert_eq!(infer_type(vals.iter()), Some(DataType::Float64));
        let vals = [utf8("true"), utf8("FALSE")];
        assert_eq!(infer_type(vals.iter()), Some(DataType::Bool));
        let vals = [utf8("1"), utf8("abc")];
        assert_eq!(infer_type(vals.iter()), Some(DataType::Utf8));
        assert_eq!(infer_type([Value::Null].iter()), None);
    }

    #[test]
    fn coerce_follows_target_type() {
        assert_eq!(coerce(&utf8("7"), DataType::Int64), Value::Int64(7));
        assert_eq!(coerce(&Value::Int64(7), DataType::Float64), Value::Float64(7.0));
        assert_eq!(coerce(&Value::Float64(7.5), DataType::Utf8), utf8("7.5"));
        assert_eq!(coerce(&Value::Null, DataType::Utf8), Value::Null);
    }
}
