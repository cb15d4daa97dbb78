#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::{IngestionError, IngestionResult};
use crate::types::Value;

use super::decode::{text_value, DecodedTable, SheetSelection};

/// Decode an in-memory workbook (`.xlsx`, `.xls`, `.ods`, etc.) into untyped tables.
///
/// Behavior:
/// - [`SheetSelection::First`] and [`SheetSelection::Named`] yield one table labelled with the
///   file name; [`SheetSelection::All`] yields one table per sheet labelled `file:sheet`
/// - Detects the first non-empty row as the header row
/// - Skips fully empty rows below the header
/// - Keeps native cell types (numbers stay numbers); empty cells, blank text and missing-value
///   tokens become nulls
pub fn decode_workbook(
    file: &str,
    bytes: &[u8],
    sheet: &SheetSelection,
) -> IngestionResult<Vec<DecodedTable>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IngestionError::format(file, format!("cannot open workbook: {e}")))?;

    let names = workbook.sheet_names().to_vec();
    let selected: Vec<String> = match sheet {
        SheetSelection::First => names.into_iter().take(1).collect(),
        SheetSelection::Named(name) => vec![name.clone()],
        SheetSelection::All => names,
    };
    if selected.is_empty() {
        return Err(IngestionError::format(file, "workbook has no sheets"));
    }

    let label_sheets = matches!(sheet, SheetSelection::All);
    let mut tables = Vec::with_capacity(selected.len());
    for name in selected {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            IngestionError::format(file, format!("cannot read sheet '{name}': {e}"))
        })?;
        let source = if label_sheets {
            format!("{file}:{name}")
        } else {
            file.to_string()
        };
        tables.push(decode_sheet_range(source, &name, &range)?);
    }

    Ok(tables)
}

fn decode_sheet_range(
    source: String,
    sheet: &str,
    range: &calamine::Range<Data>,
) -> IngestionResult<DecodedTable> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| {
            IngestionError::format(
                &source,
                format!("sheet '{sheet}' has no non-empty rows (no header row found)"),
            )
        })?;

    let mut rows = range.rows().enumerate().skip(header_row_idx);
    let headers = match rows.next() {
        Some((_, row)) => row.iter().map(cell_to_header_string).collect(),
        None => Vec::new(),
    };

    let mut table = DecodedTable::new(source, headers);
    for (idx0, row) in rows {
        let cells: Vec<Value> = row.iter().map(cell_to_value).collect();
        if cells.iter().all(Value::is_null) {
            continue;
        }
        // 1-based row number (Excel-like), offset by the range start.
        let user_row = range.start().map(|(r, _)| r as usize).unwrap_or(0) + idx0 + 1;
        table.push_row(user_row, cells)?;
    }

    Ok(table)
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_to_value(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => text_value(s),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
        // Error cells such as `#N/A` go through the same missing-value check as text.
        other => text_value(&other.to_string()),
    }
}
