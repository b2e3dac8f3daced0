//! Abstract visual elements that can be mounted in the staging area.
//!
//! A [`VisualSpec`] describes *what* to draw; the [`crate::raster`] module decides *how*. Text
//! blocks and tables carry a small subset of styling information, mirroring what a report needs:
//! weight, size, colour and alignment.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::CaptureError;
use crate::model::{Row, SummaryEntry};

/// An RGB colour.
pub type Rgb = [u8; 3];

/// Default text colour.
pub const INK: Rgb = [33, 37, 41];
/// Default table header fill.
pub const HEADER_FILL: Rgb = [232, 236, 241];
/// Fill used for every other body row.
pub const STRIPE_FILL: Rgb = [248, 249, 250];
/// Grid line colour.
pub const GRID: Rgb = [206, 212, 218];

/// Horizontal text alignment inside a staged element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Left,
    /// Centred.
    Center,
    /// Right aligned.
    Right,
}

/// A block of text with uniform styling. Newlines start new paragraphs; long lines wrap.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    text: String,
    font_size_px: f32,
    bold: bool,
    color: Rgb,
    align: TextAlign,
}

impl TextBlock {
    /// Creates a 16px regular block.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size_px: 16.0,
            bold: false,
            color: INK,
            align: TextAlign::Left,
        }
    }

    /// Returns the text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the font size in base pixels.
    pub fn font_size_px(&self) -> f32 {
        self.font_size_px
    }

    /// Returns whether the block is bold.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Returns the text colour.
    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Returns the alignment.
    pub fn align(&self) -> TextAlign {
        self.align
    }

    /// Sets the font size and returns the updated block.
    pub fn with_font_size(mut self, font_size_px: f32) -> Self {
        self.font_size_px = font_size_px;
        self
    }

    /// Marks the block as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Sets the colour and returns the updated block.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Sets the alignment and returns the updated block.
    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

/// A styled table: a filled header row over striped body rows, all cells rendered as text.
#[derive(Clone, Debug, PartialEq)]
pub struct TableVisual {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    font_size_px: f32,
}

impl TableVisual {
    /// Creates a table from headers and already formatted rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            font_size_px: 14.0,
        }
    }

    /// Builds a table from dataset rows, formatting every cell.
    pub fn from_rows(headers: &[String], rows: &[Row]) -> Self {
        Self::new(
            headers.to_vec(),
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }

    /// Builds the two-column key/value table of the report summary.
    pub fn key_value(entries: &[SummaryEntry]) -> Self {
        Self::new(
            vec!["Metric".to_owned(), "Value".to_owned()],
            entries
                .iter()
                .map(|entry| vec![entry.label.clone(), entry.value.to_string()])
                .collect(),
        )
    }

    /// Returns the header labels.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the formatted body rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the font size in base pixels.
    pub fn font_size_px(&self) -> f32 {
        self.font_size_px
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// A host-owned element that knows how to paint itself, such as a chart's container.
pub trait StageElement {
    /// Height in base pixels when laid out at `width_px`.
    fn height_px(&self, width_px: u32) -> u32;

    /// Paints the element into `canvas`, which is already sized for the requested scale.
    fn paint(&self, canvas: &mut RgbaImage, scale: f32) -> Result<(), CaptureError>;
}

/// Anything the staging area can mount.
#[derive(Clone)]
pub enum VisualSpec {
    /// A styled text block.
    Text(TextBlock),
    /// A styled table.
    Table(TableVisual),
    /// A host element painting itself.
    Element(Arc<dyn StageElement + Send + Sync>),
}

impl VisualSpec {
    /// Short name used in log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            VisualSpec::Text(_) => "text block",
            VisualSpec::Table(_) => "table",
            VisualSpec::Element(_) => "element",
        }
    }
}

impl fmt::Debug for VisualSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualSpec::Text(block) => f.debug_tuple("Text").field(block).finish(),
            VisualSpec::Table(table) => f.debug_tuple("Table").field(table).finish(),
            VisualSpec::Element(_) => f.write_str("Element(..)"),
        }
    }
}

impl From<TextBlock> for VisualSpec {
    fn from(block: TextBlock) -> Self {
        VisualSpec::Text(block)
    }
}

impl From<TableVisual> for VisualSpec {
    fn from(table: TableVisual) -> Self {
        VisualSpec::Table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    #[test]
    fn table_formats_cells() {
        let table = TableVisual::from_rows(
            &["Dept".to_owned(), "Count".to_owned()],
            &[vec![CellValue::from("Ops"), CellValue::Number(7.0)]],
        );
        assert_eq!(table.rows(), &[vec!["Ops".to_owned(), "7".to_owned()]]);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn key_value_table_uses_labels() {
        let table = TableVisual::key_value(&[SummaryEntry::new("Pending", 4i64)]);
        assert_eq!(table.headers(), &["Metric".to_owned(), "Value".to_owned()]);
        assert_eq!(table.rows()[0], vec!["Pending".to_owned(), "4".to_owned()]);
    }
}
