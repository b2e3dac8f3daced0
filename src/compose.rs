//! Sequencing a report run.
//!
//! [`ReportComposer`] walks a fixed list of phases:
//!
//! 1. *Init* checks the request. A missing section list, a blank title or a ragged dataset aborts
//!    the run with [`ReportError::FatalInput`].
//! 2. *Branding* places the two logos when they load. Missing logos are skipped.
//! 3. *Title block* places the title and the covered date range.
//! 4. *Summary table* places the key/value statistics.
//! 5. *Sections* are composed one at a time into a [`SectionResult`]; a failing section degrades
//!    to a placeholder and never stops the run.
//! 6. *Finalize* stamps `Page i of N` on every page.
//! 7. *Emit* renders the PDF and hands it to a [`SaveTarget`].
//!
//! Errors raised before the first section are fatal. Every rasterize and capture call goes through
//! the composer's single [`Rasterizer`], so sections are never processed concurrently.

use log::{debug, info, warn};

use crate::assets::{AssetLoader, FileAssetLoader};
use crate::capture::ChartCapturer;
use crate::document::{
    Document, DocumentDraft, PageContent, TablePage, BLOCK_GAP_MM, HEADING_HEIGHT_MM,
    TEXT_LINE_HEIGHT_MM,
};
use crate::error::{LayoutError, ReportError, SectionError};
use crate::layout::Placement;
use crate::model::{ReportRequest, SectionSpec};
use crate::options::ReportOptions;
use crate::output::{report_filename, SaveTarget};
use crate::paginate::paginate;
use crate::raster::{RasterImage, Rasterizer};
use crate::render;
use crate::visual::{Rgb, TableVisual, TextAlign, TextBlock, VisualSpec};

const TITLE_COLOR: Rgb = [31, 58, 96];
const TITLE_FONT_PX: f32 = 28.0;
const SUBTITLE_FONT_PX: f32 = 16.0;
const TITLE_MAX_HEIGHT_MM: f64 = 30.0;
const SUBTITLE_MAX_HEIGHT_MM: f64 = 15.0;

/// A captured bitmap and where it goes on its page.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedImage {
    /// The bitmap.
    pub image: RasterImage,
    /// Its fitted size and offset.
    pub placement: Placement,
}

/// One page of a section's detail table.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionTable {
    /// Section title with its `(page i of n)` suffix.
    pub caption: String,
    /// Cell contents and, when rasterized, the table bitmap.
    pub table: TablePage,
    /// Fitted size of the bitmap; `None` when the table is written natively.
    pub placement: Option<Placement>,
}

/// What stands in a section's chart slot.
#[derive(Clone, Debug, PartialEq)]
pub enum ChartOutput {
    /// A strategy captured the chart.
    Captured(PlacedImage),
    /// Every strategy failed; this text is shown instead.
    Placeholder(String),
}

/// Everything a successfully composed section contributes.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionContent {
    /// Section title.
    pub title: String,
    /// The chart capture or its placeholder. `None` when the section has no chart.
    pub chart: Option<ChartOutput>,
    /// Detail table pages in order.
    pub tables: Vec<SectionTable>,
}

/// The outcome of composing one section.
#[derive(Clone, Debug, PartialEq)]
pub enum SectionResult {
    /// The section has a chart, a table, or both.
    Rendered(SectionContent),
    /// The section had nothing to show or failed; it becomes a placeholder page.
    Degraded {
        /// Section title.
        title: String,
        /// Text shown instead of the content.
        placeholder: String,
    },
    /// An optional section with nothing to show; it produces no page.
    Skipped,
}

/// How a section ended up in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionStatus {
    /// Chart and/or table pages were placed.
    Rendered,
    /// A placeholder page was placed.
    Degraded,
    /// Nothing was placed.
    Skipped,
}

/// Per-section summary reported back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionOutcome {
    /// Section title.
    pub title: String,
    /// What happened to the section.
    pub status: SectionStatus,
    /// Whether a chart image was placed.
    pub chart_captured: bool,
    /// Number of detail table pages placed.
    pub table_pages: usize,
}

impl SectionOutcome {
    fn new(title: &str, result: &SectionResult) -> Self {
        let (status, chart_captured, table_pages) = match result {
            SectionResult::Rendered(content) => (
                SectionStatus::Rendered,
                matches!(content.chart, Some(ChartOutput::Captured(_))),
                content.tables.len(),
            ),
            SectionResult::Degraded { .. } => (SectionStatus::Degraded, false, 0),
            SectionResult::Skipped => (SectionStatus::Skipped, false, 0),
        };
        Self {
            title: title.to_string(),
            status,
            chart_captured,
            table_pages,
        }
    }
}

/// A finalized document with the outcome of every section.
#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    /// The page-numbered document.
    pub document: Document,
    /// One entry per requested section, in order.
    pub sections: Vec<SectionOutcome>,
}

/// What a successful run handed to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedReport {
    /// Name the artifact was saved under.
    pub filename: String,
    /// Number of pages.
    pub page_count: usize,
    /// Size of the artifact in bytes.
    pub byte_len: usize,
    /// One entry per requested section, in order.
    pub sections: Vec<SectionOutcome>,
}

/// Drives a report run from request to saved artifact.
pub struct ReportComposer {
    rasterizer: Rasterizer,
    capturer: ChartCapturer,
    assets: Box<dyn AssetLoader>,
    options: ReportOptions,
}

impl ReportComposer {
    /// Creates a composer over `rasterizer` with default options, every capture strategy and
    /// logos read from the file system.
    pub fn new(mut rasterizer: Rasterizer) -> Self {
        let options = ReportOptions::default();
        rasterizer.set_base_width(options.staging_width_px());
        Self {
            rasterizer,
            capturer: ChartCapturer::default(),
            assets: Box::new(FileAssetLoader),
            options,
        }
    }

    /// Creates a composer whose staging area draws with the bundled fonts.
    pub fn with_bundled_fonts() -> Result<Self, ReportError> {
        Ok(Self::new(
            Rasterizer::with_bundled_fonts().map_err(ReportError::Fonts)?,
        ))
    }

    /// Replaces the options and returns the updated composer.
    pub fn with_options(mut self, options: ReportOptions) -> Self {
        self.rasterizer.set_base_width(options.staging_width_px());
        self.options = options;
        self
    }

    /// Replaces the chart capturer and returns the updated composer.
    pub fn with_capturer(mut self, capturer: ChartCapturer) -> Self {
        self.capturer = capturer;
        self
    }

    /// Replaces the branding asset loader and returns the updated composer.
    pub fn with_asset_loader(mut self, assets: impl AssetLoader + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    /// The active options.
    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// The rasterizer every capture goes through.
    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Runs every phase and saves the rendered PDF through `target`.
    pub fn generate(
        &mut self,
        request: &ReportRequest,
        target: &mut dyn SaveTarget,
    ) -> Result<GeneratedReport, ReportError> {
        let Composition { document, sections } = self.compose(request)?;

        debug!("Phase: emit");
        let bytes = render::render_pdf(&document)?;
        #[cfg(feature = "bookmarks")]
        let bytes = crate::bookmarks::apply_section_bookmarks(&bytes, document.section_starts())?;

        let filename = report_filename(
            request.title(),
            self.options.generation_date(),
            self.options.file_extension(),
        );
        target
            .save(&filename, &bytes)
            .map_err(|source| ReportError::Save {
                filename: filename.clone(),
                source,
            })?;
        info!(
            "Generated '{}': {} pages, {} bytes",
            filename,
            document.page_count(),
            bytes.len()
        );

        Ok(GeneratedReport {
            filename,
            page_count: document.page_count(),
            byte_len: bytes.len(),
            sections,
        })
    }

    /// Runs every phase up to and including page numbering.
    pub fn compose(&mut self, request: &ReportRequest) -> Result<Composition, ReportError> {
        debug!("Phase: init");
        let sections = validate(request)?;
        info!(
            "Composing report '{}' with {} section(s)",
            request.title(),
            sections.len()
        );

        let mut draft = DocumentDraft::new(request.title(), *self.options.layout());
        draft.start_page();

        debug!("Phase: branding");
        self.place_branding(&mut draft);

        debug!("Phase: title block");
        self.place_title_block(&mut draft, request)?;

        debug!("Phase: summary table");
        self.place_summary(&mut draft, request)?;

        let mut outcomes = Vec::with_capacity(sections.len());
        for spec in sections {
            debug!("Phase: section '{}'", spec.title());
            let result = self.compose_section(spec);
            outcomes.push(SectionOutcome::new(spec.title(), &result));
            place_section(&mut draft, result);
        }

        debug!("Phase: finalize");
        let document = draft.finalize();
        Ok(Composition {
            document,
            sections: outcomes,
        })
    }

    /// Composes one section. Failures are logged and turned into [`SectionResult::Degraded`].
    pub fn compose_section(&mut self, spec: &SectionSpec) -> SectionResult {
        match self.try_compose_section(spec) {
            Ok(Some(content)) => SectionResult::Rendered(content),
            Ok(None) if spec.is_optional() => {
                debug!("Skipping optional section '{}': nothing to show", spec.title());
                SectionResult::Skipped
            }
            Ok(None) => {
                warn!(
                    "Section '{}' has no chart and no rows; using placeholder",
                    spec.title()
                );
                self.degraded(spec)
            }
            Err(err) => {
                warn!(
                    "Section '{}' failed, using placeholder: {}",
                    spec.title(),
                    err
                );
                self.degraded(spec)
            }
        }
    }

    fn degraded(&self, spec: &SectionSpec) -> SectionResult {
        SectionResult::Degraded {
            title: spec.title().to_string(),
            placeholder: self.options.placeholder_text().to_string(),
        }
    }

    fn try_compose_section(
        &mut self,
        spec: &SectionSpec,
    ) -> Result<Option<SectionContent>, SectionError> {
        let layout = *self.options.layout();
        let scale = self.options.capture_scale();

        let mut chart = None;
        if let Some(handle) = spec.chart() {
            if let Some(view) = spec.chart_view() {
                handle.select_view(view)?;
                handle.wait_until_settled()?;
            }
            chart = Some(
                match self.capturer.capture(handle, &mut self.rasterizer, scale) {
                    Some(image) => {
                        let max_height = self
                            .options
                            .chart_max_height_mm()
                            .min(layout.body_height_mm() - HEADING_HEIGHT_MM - BLOCK_GAP_MM);
                        let placement = layout.fit(
                            image.pixel_width(),
                            image.pixel_height(),
                            layout.content_width_mm(),
                            max_height,
                        )?;
                        ChartOutput::Captured(PlacedImage { image, placement })
                    }
                    None => ChartOutput::Placeholder(self.options.placeholder_text().to_string()),
                },
            );
        }

        let mut pieces = Vec::new();
        if let Some(dataset) = spec.dataset() {
            let rows = dataset.filtered_rows(spec.row_filter());
            if rows.is_empty() {
                debug!(
                    "Section '{}' has no rows after filtering; table skipped",
                    spec.title()
                );
            } else {
                let max_height = layout.body_height_mm() - HEADING_HEIGHT_MM - BLOCK_GAP_MM;
                for page in paginate(&rows, self.options.pagination())? {
                    let visual = TableVisual::from_rows(dataset.headers(), &page);
                    let image = self
                        .rasterizer
                        .rasterize(&VisualSpec::Table(visual.clone()), scale);
                    let placement = image
                        .as_ref()
                        .map(|image| {
                            layout.fit(
                                image.pixel_width(),
                                image.pixel_height(),
                                layout.content_width_mm(),
                                max_height,
                            )
                        })
                        .transpose()?;
                    let table =
                        TablePage::new(visual.headers().to_vec(), visual.rows().to_vec(), image);
                    match placement {
                        Some(placement) => pieces.push((table, Some(placement))),
                        None => pieces.extend(
                            table
                                .split_to_fit(max_height)
                                .into_iter()
                                .map(|piece| (piece, None)),
                        ),
                    }
                }
            }
        }

        let has_capture = matches!(chart, Some(ChartOutput::Captured(_)));
        if !has_capture && pieces.is_empty() {
            return Ok(None);
        }

        let total = pieces.len();
        let tables = pieces
            .into_iter()
            .enumerate()
            .map(|(index, (table, placement))| SectionTable {
                caption: format!("{} (page {} of {})", spec.title(), index + 1, total),
                table,
                placement,
            })
            .collect();
        Ok(Some(SectionContent {
            title: spec.title().to_string(),
            chart,
            tables,
        }))
    }

    fn place_branding(&self, draft: &mut DocumentDraft) {
        let primary = self
            .options
            .primary_logo()
            .and_then(|path| self.assets.load(path));
        let secondary = self
            .options
            .secondary_logo()
            .and_then(|path| self.assets.load(path));
        if primary.is_none() && secondary.is_none() {
            debug!("No branding assets available");
            return;
        }
        let width = draft.layout().content_width_mm();
        draft.place(
            PageContent::Branding { primary, secondary },
            width,
            self.options.logo_max_height_mm(),
            0.0,
        );
    }

    fn place_title_block(
        &mut self,
        draft: &mut DocumentDraft,
        request: &ReportRequest,
    ) -> Result<(), LayoutError> {
        let title = TextBlock::new(request.title())
            .with_font_size(TITLE_FONT_PX)
            .with_color(TITLE_COLOR)
            .bold()
            .with_align(TextAlign::Center);
        self.place_text(draft, title, TITLE_MAX_HEIGHT_MM)?;

        let period = request
            .date_range()
            .describe(self.options.all_periods_label());
        let period = TextBlock::new(period)
            .with_font_size(SUBTITLE_FONT_PX)
            .with_align(TextAlign::Center);
        self.place_text(draft, period, SUBTITLE_MAX_HEIGHT_MM)
    }

    fn place_summary(
        &mut self,
        draft: &mut DocumentDraft,
        request: &ReportRequest,
    ) -> Result<(), LayoutError> {
        if request.summary().is_empty() {
            debug!("No summary statistics; summary table skipped");
            return Ok(());
        }
        draft.place_heading(self.options.summary_title());

        let visual = TableVisual::key_value(request.summary());
        let image = self
            .rasterizer
            .rasterize(&VisualSpec::Table(visual.clone()), self.options.capture_scale());
        let table = TablePage::new(visual.headers().to_vec(), visual.rows().to_vec(), image);
        let width = draft.layout().content_width_mm();
        match table.image() {
            Some(image) => {
                let max_height = draft.layout().body_height_mm() - HEADING_HEIGHT_MM;
                let placement = draft.layout().fit(
                    image.pixel_width(),
                    image.pixel_height(),
                    width,
                    max_height,
                )?;
                draft.place(
                    PageContent::Table(table),
                    placement.width_mm,
                    placement.height_mm,
                    placement.x_offset_mm,
                );
            }
            None => {
                let max_height = draft.layout().body_height_mm() - HEADING_HEIGHT_MM - BLOCK_GAP_MM;
                for piece in table.split_to_fit(max_height) {
                    let height = piece.native_height_mm();
                    draft.place(PageContent::Table(piece), width, height, 0.0);
                }
            }
        }
        Ok(())
    }

    fn place_text(
        &mut self,
        draft: &mut DocumentDraft,
        block: TextBlock,
        max_height_mm: f64,
    ) -> Result<(), LayoutError> {
        let image = self
            .rasterizer
            .rasterize(&VisualSpec::Text(block.clone()), self.options.capture_scale());
        let width = draft.layout().content_width_mm();
        match image {
            Some(image) => {
                let placement = draft.layout().fit(
                    image.pixel_width(),
                    image.pixel_height(),
                    width,
                    max_height_mm,
                )?;
                draft.place(
                    PageContent::Text {
                        block,
                        image: Some(image),
                    },
                    placement.width_mm,
                    placement.height_mm,
                    placement.x_offset_mm,
                );
            }
            None => {
                let lines = block.text().lines().count().max(1) as f64;
                draft.place(
                    PageContent::Text { block, image: None },
                    width,
                    TEXT_LINE_HEIGHT_MM * lines,
                    0.0,
                );
            }
        }
        Ok(())
    }
}

fn validate(request: &ReportRequest) -> Result<&[SectionSpec], ReportError> {
    let sections = request
        .sections()
        .ok_or_else(|| ReportError::FatalInput("request has no section list".into()))?;
    if request.title().trim().is_empty() {
        return Err(ReportError::FatalInput("report title is blank".into()));
    }
    for spec in sections {
        if let Some(dataset) = spec.dataset() {
            dataset.validate().map_err(|reason| {
                ReportError::FatalInput(format!(
                    "dataset of section '{}' is malformed: {}",
                    spec.title(),
                    reason
                ))
            })?;
        }
    }
    Ok(sections)
}

fn place_section(draft: &mut DocumentDraft, result: SectionResult) {
    let width = draft.layout().content_width_mm();
    match result {
        SectionResult::Rendered(content) => {
            let mut marked = false;
            if let Some(chart) = content.chart {
                draft.start_fresh_page();
                draft.mark_section_start(content.title.as_str());
                marked = true;
                draft.place_heading(content.title.as_str());
                match chart {
                    ChartOutput::Captured(chart) => draft.place(
                        PageContent::Image(chart.image),
                        chart.placement.width_mm,
                        chart.placement.height_mm,
                        chart.placement.x_offset_mm,
                    ),
                    ChartOutput::Placeholder(text) => draft.place(
                        PageContent::Placeholder(text),
                        width,
                        TEXT_LINE_HEIGHT_MM * 2.0,
                        0.0,
                    ),
                };
            }
            for table in content.tables {
                draft.start_fresh_page();
                if !marked {
                    draft.mark_section_start(content.title.as_str());
                    marked = true;
                }
                draft.place_heading(table.caption);
                let (width_mm, height_mm, x_offset_mm) = match table.placement {
                    Some(placement) => (
                        placement.width_mm,
                        placement.height_mm,
                        placement.x_offset_mm,
                    ),
                    None => (width, table.table.native_height_mm(), 0.0),
                };
                draft.place(
                    PageContent::Table(table.table),
                    width_mm,
                    height_mm,
                    x_offset_mm,
                );
            }
        }
        SectionResult::Degraded { title, placeholder } => {
            draft.start_fresh_page();
            draft.mark_section_start(title.as_str());
            draft.place_heading(title);
            draft.place(
                PageContent::Placeholder(placeholder),
                width,
                TEXT_LINE_HEIGHT_MM * 2.0,
                0.0,
            );
        }
        SectionResult::Skipped => {}
    }
}
