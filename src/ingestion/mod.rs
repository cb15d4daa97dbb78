//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`Pipeline::process`] or [`process_files`] (from [`pipeline`]), which:
//!
//! - dispatch each [`RawFile`] to a [`Decoder`] by file extension (or a forced [`IngestionFormat`])
//! - validate the required budget columns and clean rows ([`normalize`])
//! - concatenate everything into one in-memory [`crate::types::DataSet`]
//! - optionally report per-file success/failure/alerts to an [`IngestionObserver`]
//! - optionally memoize results in a [`ProcessCache`] keyed by a content [`Fingerprint`]
//!
//! Format-specific decoding lives in:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod cache;
pub mod csv;
pub mod decode;
#[cfg(feature = "excel")]
pub mod excel;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod raw;

pub use cache::{Fingerprint, InMemoryCache, ProcessCache};
pub use decode::{
    DecodedRow, DecodedTable, Decoder, DecoderKind, DelimitedTextDecoder, IngestionFormat, SheetSelection,
    SpreadsheetDecoder,
};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    StdErrObserver, TracingObserver,
};
pub use pipeline::{concat, process_files, process_paths, IngestionOptions, Pipeline};
pub use raw::RawFile;
