//! Core entry point for the report_composer crate.
//!
//! The crate turns a [`ReportRequest`] of statistics, tables and live chart handles into a
//! paginated A4 PDF. [`ReportComposer`] sequences the run; the remaining modules are the pieces
//! it drives.

pub mod assets;
pub mod capture;
pub mod compose;
pub mod document;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod options;
pub mod output;
pub mod paginate;
pub mod raster;
pub mod render;
pub mod visual;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use compose::{GeneratedReport, ReportComposer, SectionResult, SectionStatus};
pub use error::ReportError;
pub use model::{ReportRequest, SectionSpec, TableDataset};
pub use options::ReportOptions;
