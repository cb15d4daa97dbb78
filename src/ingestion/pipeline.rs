//! Multi-file ingestion entrypoint.
//!
//! Most callers should use [`Pipeline::process`] (memoized) or [`process_files`] (one-shot).
//! Both decode each file by format, enforce the budget schema, clean rows, derive
//! `Difference`, and concatenate the per-file tables in arrival order.
//!
//! - If [`IngestionOptions::format`] is `None`, each file's format is inferred from its name.
//! - If an [`IngestionObserver`] is provided, per-file success/failure/alerts are reported to it.
//! - The first failing file aborts the whole call; no partial table is returned.

use std::fmt;
use std::sync::Arc;

use crate::error::IngestionResult;
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::cache::{Fingerprint, ProcessCache};
use super::decode::{Decoder, IngestionFormat, SheetSelection};
use super::normalize::{coerce, normalize};
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::raw::RawFile;

/// Options controlling ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, infer each file's format from its extension.
    pub format: Option<IngestionFormat>,
    /// Spreadsheet sheet selection.
    pub sheet: SheetSelection,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("sheet", &self.sheet)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            sheet: SheetSelection::default(),
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestionOptions {
    /// Decode-affecting options, folded into the cache fingerprint.
    fn cache_tag(&self) -> String {
        format!("format={:?};sheet={:?}", self.format, self.sheet)
    }
}

/// Ingest an ordered set of files into one unified table.
///
/// Zero files yield an empty table with the canonical schema.
///
/// # Examples
///
/// ```
/// use lb_budget::ingestion::{process_files, IngestionOptions, RawFile};
/// use lb_budget::types::Value;
///
/// # fn main() -> Result<(), lb_budget::IngestionError> {
/// let a = RawFile::new(
///     "north.csv",
///     "Code,LBType,Tot,TotExp,Sector,District\n1,X,100,80,S1,D1\n",
/// );
/// let b = RawFile::new(
///     "south.csv",
///     "Code,LBType,Tot,TotExp,Sector,District\n,Y,0,0,S2,D2\n2,Y,50,50,S2,D2\n",
/// );
///
/// let ds = process_files(&[a, b], &IngestionOptions::default())?;
/// assert_eq!(ds.row_count(), 2);
/// assert_eq!(ds.value(0, "Difference"), Some(&Value::Float64(20.0)));
/// assert_eq!(ds.value(1, "Difference"), Some(&Value::Float64(0.0)));
/// # Ok(())
/// # }
/// ```
pub fn process_files(files: &[RawFile], options: &IngestionOptions) -> IngestionResult<DataSet> {
    if files.is_empty() {
        return Ok(DataSet::empty());
    }

    let mut accumulated: Vec<DataSet> = Vec::with_capacity(files.len());
    for file in files {
        let mut ctx = IngestionContext {
            file: file.name.clone(),
            format: options.format,
        };
        let result = ingest_one(file, options, &mut ctx);
        report(options, &ctx, &result);
        let (tables, _) = result?;
        accumulated.extend(tables);
    }

    Ok(concat(accumulated))
}

/// Decode, validate and clean one file. Returns its tables (one per sheet) and stats.
fn ingest_one(
    file: &RawFile,
    options: &IngestionOptions,
    ctx: &mut IngestionContext,
) -> IngestionResult<(Vec<DataSet>, IngestionStats)> {
    let format = match options.format {
        Some(f) => f,
        None => IngestionFormat::infer(file)?,
    };
    ctx.format = Some(format);

    let decoder = format.decoder(&options.sheet);
    tracing::debug!(file = %file.name, decoder = decoder.name(), bytes = file.content.len(), "decoding");
    let decoded = decoder.decode(file)?;

    let mut stats = IngestionStats {
        rows: 0,
        dropped_rows: 0,
    };
    let mut tables = Vec::with_capacity(decoded.len());
    for table in &decoded {
        let normalized = normalize(table)?;
        stats.rows += normalized.dataset.row_count();
        stats.dropped_rows += normalized.dropped_rows;
        tables.push(normalized.dataset);
    }
    Ok((tables, stats))
}

fn report(
    options: &IngestionOptions,
    ctx: &IngestionContext,
    result: &IngestionResult<(Vec<DataSet>, IngestionStats)>,
) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match result {
        Ok((_, stats)) => obs.on_success(ctx, *stats),
        Err(e) => {
            let sev = IngestionSeverity::of(e);
            obs.on_failure(ctx, sev, e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

/// Concatenate per-file tables, preserving table and row order.
///
/// The unified schema is the first table's columns followed by columns first seen in later
/// tables. A column whose type differs between tables is widened (see [`crate::types::DataType::widen`]);
/// rows from tables lacking a column get [`Value::Null`] there.
pub fn concat(tables: Vec<DataSet>) -> DataSet {
    // Per unified column: declared type at first appearance, and the widened type over
    // tables that actually hold values in it. All-null columns do not constrain the type.
    let mut fields: Vec<(Field, Option<DataType>)> = Vec::new();
    for table in &tables {
        for (idx, field) in table.schema.fields.iter().enumerate() {
            let has_values = table.rows.iter().any(|r| r.get(idx).is_some_and(|v| !v.is_null()));
            let seen = has_values.then_some(field.data_type);
            match fields.iter_mut().find(|(f, _)| f.name == field.name) {
                Some((_, widened)) => {
                    *widened = match (*widened, seen) {
                        (Some(a), Some(b)) => Some(a.widen(b)),
                        (a, b) => a.or(b),
                    };
                }
                None => fields.push((field.clone(), seen)),
            }
        }
    }
    if fields.is_empty() {
        return DataSet::empty();
    }
    let unified = Schema::new(
        fields
            .into_iter()
            .map(|(f, widened)| Field::new(f.name, widened.unwrap_or(f.data_type)))
            .collect(),
    );

    let total_rows = tables.iter().map(DataSet::row_count).sum();
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(total_rows);
    for table in tables {
        if table.schema == unified {
            rows.extend(table.rows);
            continue;
        }
        let projection: Vec<Option<usize>> = unified
            .fields
            .iter()
            .map(|f| table.schema.index_of(&f.name))
            .collect();
        for row in &table.rows {
            let out = projection
                .iter()
                .zip(&unified.fields)
                .map(|(src, field)| match src.and_then(|i| row.get(i)) {
                    Some(v) => coerce(v, field.data_type),
                    None => Value::Null,
                })
                .collect();
            rows.push(out);
        }
    }

    DataSet::new(unified, rows)
}

/// Memoizing front-end to [`process_files`].
///
/// Results are keyed by a [`Fingerprint`] of the ordered file set (plus decode options), so
/// repeated calls with byte-identical input return the same shared table without decoding
/// again. Failed calls are never cached.
pub struct Pipeline {
    options: IngestionOptions,
    cache: Option<Arc<dyn ProcessCache>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("cache_set", &self.cache.is_some())
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(IngestionOptions::default())
    }
}

impl Pipeline {
    /// Create an uncached pipeline.
    pub fn new(options: IngestionOptions) -> Self {
        Self {
            options,
            cache: None,
        }
    }

    /// Attach a result cache.
    pub fn with_cache(mut self, cache: Arc<dyn ProcessCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    /// Fingerprint under which `files` would be cached.
    pub fn fingerprint(&self, files: &[RawFile]) -> Fingerprint {
        Fingerprint::of_files_tagged(files, &self.options.cache_tag())
    }

    /// Ingest `files`, serving from the cache when the same input was seen before.
    pub fn process(&self, files: &[RawFile]) -> IngestionResult<Arc<DataSet>> {
        let Some(cache) = self.cache.as_ref() else {
            return process_files(files, &self.options).map(Arc::new);
        };

        let key = self.fingerprint(files);
        if let Some(hit) = cache.get(&key) {
            tracing::debug!(fingerprint = %key, rows = hit.row_count(), "cache hit");
            return Ok(hit);
        }

        tracing::debug!(fingerprint = %key, files = files.len(), "cache miss");
        let table = Arc::new(process_files(files, &self.options)?);
        cache.insert(key, Arc::clone(&table));
        Ok(table)
    }
}

/// Ingest files read from disk.
///
/// Convenience for callers holding paths rather than uploaded blobs; I/O failures surface as
/// [`crate::IngestionError::Io`].
pub fn process_paths<P: AsRef<std::path::Path>>(
    paths: &[P],
    options: &IngestionOptions,
) -> IngestionResult<DataSet> {
    let files = paths
        .iter()
        .map(RawFile::from_path)
        .collect::<IngestionResult<Vec<_>>>()?;
    process_files(&files, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionError;

    fn ds(fields: &[(&str, DataType)], rows: Vec<Vec<Value>>) -> DataSet {
        DataSet::new(
            Schema::new(fields.iter().map(|(n, t)| Field::new(*n, *t)).collect()),
            rows,
        )
    }

    #[test]
    fn concat_of_nothing_is_canonical_empty() {
        assert_eq!(concat(Vec::new()), DataSet::empty());
    }

    #[test]
    fn concat_unions_columns_and_widens_types() {
        let a = ds(
            &[("Code", DataType::Utf8), ("Ward", DataType::Int64)],
            vec![vec![Value::Utf8("1".to_string()), Value::Int64(3)]],
        );
        let b = ds(
            &[("Code", DataType::Utf8), ("Ward", DataType::Float64), ("Note", DataType::Utf8)],
            vec![vec![
                Value::Utf8("2".to_string()),
                Value::Float64(4.5),
                Value::Utf8("n".to_string()),
            ]],
        );
        let out = concat(vec![a, b]);
        assert_eq!(out.schema.field_names().collect::<Vec<_>>(), vec!["Code", "Ward", "Note"]);
        assert_eq!(out.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(
            out.rows,
            vec![
                vec![Value::Utf8("1".to_string()), Value::Float64(3.0), Value::Null],
                vec![
                    Value::Utf8("2".to_string()),
                    Value::Float64(4.5),
                    Value::Utf8("n".to_string())
                ],
            ]
        );
    }

    #[test]
    fn all_null_columns_do_not_widen() {
        let a = ds(
            &[("Code", DataType::Utf8), ("Ward", DataType::Utf8)],
            vec![vec![Value::Utf8("1".to_string()), Value::Null]],
        );
        let b = ds(
            &[("Code", DataType::Utf8), ("Ward", DataType::Int64)],
            vec![vec![Value::Utf8("2".to_string()), Value::Int64(7)]],
        );
        let out = concat(vec![a, b]);
        assert_eq!(out.schema.fields[1].data_type, DataType::Int64);
        assert_eq!(out.rows[0][1], Value::Null);
        assert_eq!(out.rows[1][1], Value::Int64(7));
    }

    #[test]
    fn unknown_extension_fails_before_decoding() {
        let err = process_files(&[RawFile::new("budget.json", "{}")], &IngestionOptions::default())
            .unwrap_err();
        assert!(matches!(err, IngestionError::Format { ref file, .. } if file == "budget.json"));
    }

    #[test]
    fn forced_format_overrides_extension() {
        let opts = IngestionOptions {
            format: Some(IngestionFormat::Csv),
            ..Default::default()
        };
        let file = RawFile::new(
            "export.txt",
            "Code,LBType,Tot,TotExp,Sector,District\nA,GP,1,1,S,D\n",
        );
        assert_eq!(process_files(&[file], &opts).unwrap().row_count(), 1);
    }

    #[test]
    fn cache_tag_distinguishes_sheet_selection() {
        let files = [RawFile::new("a.xlsx", "")];
        let first = Pipeline::default().fingerprint(&files);
        let all = Pipeline::new(IngestionOptions {
            sheet: SheetSelection::All,
            ..Default::default()
        })
        .fingerprint(&files);
        assert_ne!(first, all);
    }
}
