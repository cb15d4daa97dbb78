//! In-memory data transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by ingestion and
//! is what the budget analyses in [`crate::analysis`] are built from.
//!
//! Currently implemented:
//!
//! - [`filter()`]: row filtering by predicate
//! - [`reduce()`]: common reductions (count/sum/min/max)
//! - [`group_sum()`]: per-key sums of numeric columns
//!
//! ## Example: filter → reduce
//!
//! ```rust
//! use lb_budget::processing::{filter, reduce, ReduceOp};
//! use lb_budget::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("District", DataType::Utf8),
//!     Field::new("Tot", DataType::Float64),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Utf8("North".to_string()), Value::Float64(10.0)],
//!         vec![Value::Utf8("South".to_string()), Value::Float64(20.0)],
//!         vec![Value::Utf8("North".to_string()), Value::Null],
//!     ],
//! );
//!
//! let north = filter(&ds, |row| row[0].as_str() == Some("North"));
//! let sum = reduce(&north, "Tot", ReduceOp::Sum).unwrap();
//! assert_eq!(sum, Value::Float64(10.0));
//! ```

pub mod filter;
pub mod group;
pub mod reduce;

pub use filter::{filter, filter_in};
pub use group::group_sum;
pub use reduce::{reduce, sum_f64, ReduceOp};
