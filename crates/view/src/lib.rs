//! Pure presentation logic for scored pages: the running score range,
//! score colours, column inference and page aggregates.
//!
//! Nothing here does I/O; the session controller feeds it pages and the
//! front-end renders what it returns.

pub mod color;
pub mod filter;
pub mod present;
pub mod range;
pub mod schema;
pub mod summary;

pub use color::{color_for, ColorToken, ScoreColor, Severity};
pub use filter::RowFilter;
pub use present::{present, ErrorPresentation};
pub use range::RangeState;
pub use schema::{format_cell, infer_columns, ColumnSpec, RenderKind, SchemaRules};
pub use summary::{histogram, summarize, HistogramBin, PageSummary, SeverityCounts};
