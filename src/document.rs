//! The page model a report is assembled into.
//!
//! Content is appended to a [`DocumentDraft`] page by page, top to bottom. Calling
//! [`DocumentDraft::finalize`] consumes the draft, stamps every page with its `Page i of N`
//! footer and yields the immutable [`Document`] that the PDF writer serializes. The page total
//! is only known once every section has run, so numbering cannot happen any earlier.

use crate::layout::PageLayout;
use crate::raster::RasterImage;
use crate::visual::TextBlock;

/// Vertical gap left between two stacked items.
pub const BLOCK_GAP_MM: f64 = 4.0;
/// Height reserved for a native heading line.
pub const HEADING_HEIGHT_MM: f64 = 10.0;
/// Height reserved for a native line of body text.
pub const TEXT_LINE_HEIGHT_MM: f64 = 7.0;

/// One page worth of a paginated table.
#[derive(Clone, Debug, PartialEq)]
pub struct TablePage {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    image: Option<RasterImage>,
}

impl TablePage {
    /// Creates a table page; `image` is the rasterized table when capture succeeded.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, image: Option<RasterImage>) -> Self {
        Self {
            headers,
            rows,
            image,
        }
    }

    /// Header labels.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Formatted cell contents.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// The rasterized table, if any.
    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }

    /// Height of the table when written as native text.
    pub fn native_height_mm(&self) -> f64 {
        TEXT_LINE_HEIGHT_MM * (self.rows.len() + 1) as f64 + BLOCK_GAP_MM
    }

    /// Number of body rows a native table can hold within `max_height_mm`. Never less than one.
    pub fn native_rows_within(max_height_mm: f64) -> usize {
        let lines = ((max_height_mm - BLOCK_GAP_MM) / TEXT_LINE_HEIGHT_MM).floor();
        if lines.is_finite() && lines >= 2.0 {
            lines as usize - 1
        } else {
            1
        }
    }

    /// Splits a native table into pieces no taller than `max_height_mm`, repeating the header.
    ///
    /// Rasterized tables are already fitted to their region and are returned unchanged.
    pub fn split_to_fit(self, max_height_mm: f64) -> Vec<TablePage> {
        if self.image.is_some() || self.native_height_mm() <= max_height_mm {
            return vec![self];
        }
        let rows_per_piece = Self::native_rows_within(max_height_mm);
        self.rows
            .chunks(rows_per_piece)
            .map(|rows| TablePage::new(self.headers.clone(), rows.to_vec(), None))
            .collect()
    }
}

/// Content that can sit on a page.
#[derive(Clone, Debug, PartialEq)]
pub enum PageContent {
    /// Branding strip with up to two logos.
    Branding {
        /// Logo on the left.
        primary: Option<RasterImage>,
        /// Logo on the right.
        secondary: Option<RasterImage>,
    },
    /// A heading written as native text.
    Heading(String),
    /// A text block, rasterized when capture succeeded.
    Text {
        /// The text and its styling.
        block: TextBlock,
        /// The rasterized block.
        image: Option<RasterImage>,
    },
    /// A chart capture.
    Image(RasterImage),
    /// A page of a detail or summary table.
    Table(TablePage),
    /// Substitute text for a section without data.
    Placeholder(String),
}

/// An item together with where it was placed.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedContent {
    /// Distance from the top of the body area.
    pub y_mm: f64,
    /// Distance from the left content edge.
    pub x_offset_mm: f64,
    /// Rendered width.
    pub width_mm: f64,
    /// Rendered height.
    pub height_mm: f64,
    /// What was placed.
    pub content: PageContent,
}

/// A single page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    items: Vec<PlacedContent>,
    cursor_mm: f64,
    footer: Option<String>,
}

impl Page {
    /// Items in top-to-bottom order.
    pub fn items(&self) -> &[PlacedContent] {
        &self.items
    }

    /// The stamped footer. Only set on finalized documents.
    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    /// Returns `true` when nothing has been placed on the page.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Used height including trailing gap.
    pub fn used_height_mm(&self) -> f64 {
        self.cursor_mm
    }
}

/// The first page a section occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionStart {
    /// Section title.
    pub title: String,
    /// Zero-based page index.
    pub page_index: usize,
}

/// A document still under construction.
#[derive(Debug)]
pub struct DocumentDraft {
    title: String,
    layout: PageLayout,
    pages: Vec<Page>,
    section_starts: Vec<SectionStart>,
}

impl DocumentDraft {
    /// Creates a draft with no pages.
    pub fn new(title: impl Into<String>, layout: PageLayout) -> Self {
        Self {
            title: title.into(),
            layout,
            pages: Vec::new(),
            section_starts: Vec::new(),
        }
    }

    /// Page metrics.
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Number of pages so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends an empty page and makes it current.
    pub fn start_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.pages.len() - 1
    }

    /// Starts a new page unless the current one is still empty.
    pub fn start_fresh_page(&mut self) -> usize {
        match self.pages.last() {
            Some(page) if page.is_empty() => self.pages.len() - 1,
            _ => self.start_page(),
        }
    }

    /// Body height still free on the current page.
    pub fn remaining_height_mm(&self) -> f64 {
        let used = self.pages.last().map_or(0.0, Page::used_height_mm);
        (self.layout.body_height_mm() - used).max(0.0)
    }

    /// Records that the section `title` begins on the current page.
    pub fn mark_section_start(&mut self, title: impl Into<String>) {
        if self.pages.is_empty() {
            self.start_page();
        }
        self.section_starts.push(SectionStart {
            title: title.into(),
            page_index: self.pages.len() - 1,
        });
    }

    /// Places `content` below whatever is already on the current page.
    ///
    /// A new page is started first when the content would not fit and the current page already
    /// holds something. Content taller than a whole page is placed anyway.
    pub fn place(
        &mut self,
        content: PageContent,
        width_mm: f64,
        height_mm: f64,
        x_offset_mm: f64,
    ) -> usize {
        if self.pages.is_empty()
            || (height_mm > self.remaining_height_mm()
                && self.pages.last().is_some_and(|page| !page.is_empty()))
        {
            self.start_page();
        }
        let index = self.pages.len() - 1;
        let page = &mut self.pages[index];
        page.items.push(PlacedContent {
            y_mm: page.cursor_mm,
            x_offset_mm,
            width_mm,
            height_mm,
            content,
        });
        page.cursor_mm += height_mm + BLOCK_GAP_MM;
        index
    }

    /// Places a full-width native heading.
    pub fn place_heading(&mut self, text: impl Into<String>) -> usize {
        let width = self.layout.content_width_mm();
        self.place(
            PageContent::Heading(text.into()),
            width,
            HEADING_HEIGHT_MM,
            0.0,
        )
    }

    /// Stamps `Page i of N` on every page and freezes the document.
    pub fn finalize(self) -> Document {
        let mut pages = self.pages;
        let total = pages.len();
        for (index, page) in pages.iter_mut().enumerate() {
            page.footer = Some(format!("Page {} of {}", index + 1, total));
        }
        Document {
            title: self.title,
            layout: self.layout,
            pages,
            section_starts: self.section_starts,
        }
    }
}

/// A finalized, page-numbered document.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    title: String,
    layout: PageLayout,
    pages: Vec<Page>,
    section_starts: Vec<SectionStart>,
}

impl Document {
    /// The report title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Page metrics.
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// All pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The first page of every section that produced output.
    pub fn section_starts(&self) -> &[SectionStart] {
        &self.section_starts
    }

    /// Every table page in document order.
    pub fn table_pages(&self) -> impl Iterator<Item = &TablePage> {
        self.pages.iter().flat_map(|page| {
            page.items.iter().filter_map(|item| match &item.content {
                PageContent::Table(table) => Some(table),
                _ => None,
            })
        })
    }
}
