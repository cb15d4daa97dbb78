//! `lb-budget` ingests local-body budget files into one validated in-memory
//! [`types::DataSet`] and runs the standard budget analyses on it.
//!
//! The primary entrypoint is [`ingestion::Pipeline::process`] (memoized) or
//! [`ingestion::process_files`] (one-shot). Each input is a named byte blob
//! ([`ingestion::RawFile`]); files are processed in order and the first failure aborts the call.
//!
//! ## What you can ingest
//!
//! **File formats (auto-detected by extension):**
//!
//! - **CSV**: `.csv`
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! **Required columns** (exact names, any order): `Code`, `LBType`, `Tot`, `TotExp`, `Sector`,
//! `District`. Other columns are carried through.
//!
//! For every file the pipeline:
//!
//! 1. rejects it with [`IngestionError::SchemaMismatch`] if any required column is missing
//!    (the error lists every missing name)
//! 2. silently drops rows with an empty `Code`
//! 3. appends `Difference = Tot - TotExp`, failing with [`IngestionError::Type`] if either
//!    column holds something that is not a number
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use lb_budget::analysis::{compare_totals, unused_funds};
//! use lb_budget::ingestion::{InMemoryCache, IngestionOptions, Pipeline, RawFile};
//!
//! # fn main() -> Result<(), lb_budget::IngestionError> {
//! let pipeline = Pipeline::new(IngestionOptions::default()).with_cache(Arc::new(InMemoryCache::new()));
//! let files = vec![RawFile::new(
//!     "2024.csv",
//!     "Code,LBType,Tot,TotExp,Sector,District\nP1,GP,100,80,Roads,Wayanad\nP2,GP,40,0,Water,Idukki\n",
//! )];
//!
//! let table = pipeline.process(&files)?;
//! assert_eq!(table.row_count(), 2);
//!
//! let totals = compare_totals(&table)?;
//! assert_eq!(totals.total_income, 140.0);
//! assert_eq!(unused_funds(&table)?.row_count(), 1);
//!
//! // Same bytes again: served from the cache.
//! let again = pipeline.process(&files)?;
//! assert!(Arc::ptr_eq(&table, &again));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: decoding, validation, cleaning, concatenation, caching and observers
//! - [`types`]: schema + in-memory dataset types
//! - [`processing`]: generic dataset transformations (filter/reduce/group)
//! - [`analysis`]: the budget views (LBType filter, funding status, totals, districts, unused funds)
//! - [`error`]: error types

pub mod analysis;
pub mod error;
pub mod ingestion;
pub mod processing;
pub mod types;

pub use error::{IngestionError, IngestionResult};
