//! Delimited-text (CSV) decoding.

use crate::error::{IngestionError, IngestionResult};

use super::decode::{text_value, DecodedTable};

/// Decode CSV bytes into an untyped table.
///
/// Rules:
///
/// - The first record is the header row.
/// - Records may be shorter than the header; missing cells become [`Value::Null`](crate::types::Value::Null).
/// - A record longer than the header is a format error naming its row.
/// - Blank cells and missing-value tokens ([`super::decode::NA_TOKENS`]) become [`Value::Null`](crate::types::Value::Null);
///   everything else is kept as trimmed [`Value::Utf8`](crate::types::Value::Utf8). Typing happens later.
pub fn decode_csv(file: &str, bytes: &[u8]) -> IngestionResult<DecodedTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    decode_csv_from_reader(file, &mut rdr)
}

/// Decode CSV data from an existing CSV reader.
pub fn decode_csv_from_reader<R: std::io::Read>(
    file: &str,
    rdr: &mut csv::Reader<R>,
) -> IngestionResult<DecodedTable> {
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(file, e))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestionError::format(file, "csv has no header row"));
    }

    let mut table = DecodedTable::new(file, headers);
    for (row_idx0, result) in rdr.records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result.map_err(|e| csv_error(file, e))?;
        let cells = record.iter().map(text_value).collect();
        table.push_row(user_row, cells)?;
    }

    Ok(table)
}

fn csv_error(file: &str, err: csv::Error) -> IngestionError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => IngestionError::Io(e),
        _ => IngestionError::format(file, message),
    }
}
