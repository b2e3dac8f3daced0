//! Error types shared across the report composition engine.
//!
//! Only [`ReportError`] ever reaches the caller of a generation run. The other enums describe
//! failures that the orchestrator absorbs and turns into degraded output.

use std::io;

use thiserror::Error;

/// Run-level failures that abort a report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The request was missing or malformed; nothing was produced.
    #[error("invalid report request: {0}")]
    FatalInput(String),
    /// A placement before the first section could not be computed.
    #[error("failed to lay out report header: {0}")]
    Layout(#[from] LayoutError),
    /// The font family required by the PDF writer could not be loaded.
    #[error("failed to load fonts: {0}")]
    Fonts(#[source] genpdf::error::Error),
    /// The PDF writer rejected the document.
    #[error("failed to render document: {0}")]
    Render(#[source] genpdf::error::Error),
    /// The host save mechanism refused the artifact.
    #[error("failed to save {filename}: {source}")]
    Save {
        /// Name the artifact was offered under.
        filename: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Section outlines could not be written into the rendered PDF.
    #[cfg(feature = "bookmarks")]
    #[error(transparent)]
    Bookmarks(#[from] crate::bookmarks::BookmarkError),
}

/// Failures of the table paginator.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    /// There were no rows to paginate.
    #[error("dataset has no rows to paginate")]
    EmptyDataset,
    /// The policy asked for pages of zero rows.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

/// Failures of the page layout calculator.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum LayoutError {
    /// One of the intrinsic image dimensions was zero.
    #[error("image has degenerate intrinsic size {width}x{height}")]
    DegenerateImage {
        /// Intrinsic width in pixels.
        width: u32,
        /// Intrinsic height in pixels.
        height: u32,
    },
    /// The target region was empty or not a finite size.
    #[error("target region {width_mm}x{height_mm}mm cannot hold an image")]
    InvalidRegion {
        /// Maximum width in millimetres.
        width_mm: f64,
        /// Maximum height in millimetres.
        height_mm: f64,
    },
}

/// Failures while staging, capturing or encoding a visual element.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The staging area could not take the element.
    #[error("failed to mount visual: {0}")]
    Mount(String),
    /// The mounted element could not be turned into pixels.
    #[error("failed to capture staged visual: {0}")]
    Capture(String),
    /// The chart widget did not expose a usable surface.
    #[error("chart surface unavailable: {0}")]
    Surface(String),
    /// The chart widget never reported that it finished rendering.
    #[error("chart did not settle after switching view: {0}")]
    NotSettled(String),
    /// The captured pixels could not be encoded.
    #[error("failed to encode bitmap: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failures while loading a branding asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The asset file could not be read.
    #[error("failed to read asset: {0}")]
    Io(#[from] io::Error),
    /// The asset bytes are not a supported image.
    #[error("failed to decode asset: {0}")]
    Decode(#[from] image::ImageError),
    /// The decoded asset could not be flattened into a placeable bitmap.
    #[error("failed to prepare asset: {0}")]
    Prepare(#[from] CaptureError),
}

/// A per-section failure. Never escapes the orchestrator.
#[derive(Debug, Error)]
pub enum SectionError {
    /// Switching the chart view or waiting for it failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// A captured image could not be placed on the page.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The detail table could not be split into pages.
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}
