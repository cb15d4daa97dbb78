//! Format dispatch: turning a [`RawFile`] into an untyped [`DecodedTable`].
//!
//! Decoding only splits a file into a header and cells. Cells keep whatever type the source
//! format gives them (text for CSV, native numbers/bools for spreadsheets); typing against the
//! budget schema happens later in [`super::normalize`].

use std::collections::HashMap;

use crate::error::{IngestionError, IngestionResult};
use crate::types::Value;

use super::csv::decode_csv;
use super::raw::RawFile;

/// Cell texts that read as a missing value, in addition to blank cells.
///
/// Matched against the trimmed cell text, case-sensitively.
pub const NA_TOKENS: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

/// A text cell as decoders see it: trimmed, with blanks and [`NA_TOKENS`] mapped to null.
pub(crate) fn text_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if NA_TOKENS.contains(&trimmed) {
        Value::Null
    } else {
        Value::Utf8(trimmed.to_owned())
    }
}

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from a file's declared name.
    pub fn infer(file: &RawFile) -> IngestionResult<Self> {
        let ext = file.extension().ok_or_else(|| {
            IngestionError::format(&file.name, "cannot infer format: file name has no extension")
        })?;
        Self::from_extension(&ext).ok_or_else(|| {
            IngestionError::format(
                &file.name,
                format!("unsupported extension '{ext}' (expected .csv or a spreadsheet)"),
            )
        })
    }

    /// The decoder for this format.
    pub fn decoder(self, sheet: &SheetSelection) -> DecoderKind {
        match self {
            IngestionFormat::Csv => DecoderKind::DelimitedText(DelimitedTextDecoder),
            IngestionFormat::Excel => DecoderKind::Spreadsheet(SpreadsheetDecoder {
                sheet: sheet.clone(),
            }),
        }
    }
}

/// How to choose sheet(s) when decoding a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SheetSelection {
    /// Decode the first sheet.
    #[default]
    First,
    /// Decode a single named sheet.
    Named(String),
    /// Decode every sheet, in workbook order.
    All,
}

/// One data row of a decoded table, with its 1-based position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    /// 1-based row number in the source file (the header row counts).
    pub source_row: usize,
    /// Cells aligned to [`DecodedTable::headers`]; short rows are padded with [`Value::Null`].
    pub cells: Vec<Value>,
}

/// An untyped table straight out of a decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTable {
    /// Label used in errors: the file name, plus the sheet when several sheets are decoded.
    pub source: String,
    /// Column names, trimmed and de-duplicated.
    pub headers: Vec<String>,
    /// Data rows in source order.
    pub rows: Vec<DecodedRow>,
}

impl DecodedTable {
    pub(crate) fn new(source: impl Into<String>, raw_headers: Vec<String>) -> Self {
        Self {
            source: source.into(),
            headers: clean_headers(raw_headers),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls; a row wider than the header is a
    /// [`IngestionError::Format`] since its cells cannot be matched to columns.
    pub(crate) fn push_row(&mut self, source_row: usize, mut cells: Vec<Value>) -> IngestionResult<()> {
        let width = self.headers.len();
        if cells.len() > width {
            return Err(IngestionError::format(
                &self.source,
                format!("row {source_row}: expected {width} fields, saw {}", cells.len()),
            ));
        }
        cells.resize(width, Value::Null);
        self.rows.push(DecodedRow { source_row, cells });
        Ok(())
    }
}

/// Decodes a raw file into one or more untyped tables.
pub trait Decoder {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decode `file`. Spreadsheets may yield one table per selected sheet.
    fn decode(&self, file: &RawFile) -> IngestionResult<Vec<DecodedTable>>;
}

/// Comma-separated text with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTextDecoder;

impl Decoder for DelimitedTextDecoder {
    fn name(&self) -> &'static str {
        "delimited-text"
    }

    fn decode(&self, file: &RawFile) -> IngestionResult<Vec<DecodedTable>> {
        decode_csv(&file.name, &file.content).map(|t| vec![t])
    }
}

/// Workbook formats read through `calamine`.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetDecoder {
    /// Which sheet(s) to read.
    pub sheet: SheetSelection,
}

impl Decoder for SpreadsheetDecoder {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn decode(&self, file: &RawFile) -> IngestionResult<Vec<DecodedTable>> {
        #[cfg(feature = "excel")]
        {
            super::excel::decode_workbook(&file.name, &file.content, &self.sheet)
        }

        #[cfg(not(feature = "excel"))]
        {
            Err(IngestionError::format(
                &file.name,
                "excel ingestion not enabled (enable cargo feature 'excel')",
            ))
        }
    }
}

/// The decoder selected for a file, by format tag.
#[derive(Debug, Clone)]
pub enum DecoderKind {
    /// See [`SpreadsheetDecoder`].
    Spreadsheet(SpreadsheetDecoder),
    /// See [`DelimitedTextDecoder`].
    DelimitedText(DelimitedTextDecoder),
}

impl Decoder for DecoderKind {
    fn name(&self) -> &'static str {
        match self {
            DecoderKind::Spreadsheet(d) => d.name(),
            DecoderKind::DelimitedText(d) => d.name(),
        }
    }

    fn decode(&self, file: &RawFile) -> IngestionResult<Vec<DecodedTable>> {
        match self {
            DecoderKind::Spreadsheet(d) => d.decode(file),
            DecoderKind::DelimitedText(d) => d.decode(file),
        }
    }
}

/// Trim header names, name blank ones by position and suffix repeats (`X`, `X.1`, `X.2`).
fn clean_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = h.trim().trim_start_matches('\u{feff}').trim();
            let base = if h.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                h.to_string()
            };
            let n = seen.entry(base.clone()).or_insert(0);
            let name = if *n == 0 { base } else { format!("{base}.{n}") };
            *n += 1;
            name
        })
        .collect()
}
