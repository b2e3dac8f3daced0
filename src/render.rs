//! Serializing a finalized [`Document`] into PDF bytes with `genpdf`.
//!
//! Every page of the document model becomes a run of `genpdf` elements followed by a page break.
//! Rasterized content is embedded as images scaled to the width chosen at placement time; content
//! whose capture failed is written as native text or a native table instead. The page decorator
//! adds the running header with the report title and the footer stamped during finalization.

use genpdf::elements::{
    Break, FrameCellDecorator, Image, LinearLayout, PageBreak, Paragraph, TableLayout,
};
use genpdf::error::{Context as _, Error, ErrorKind};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Element, Margins, Mm, PageDecorator, Position, Scale, Size};
use log::warn;

use crate::document::{Document, PageContent, PlacedContent, TablePage};
use crate::error::ReportError;
use crate::fonts;
use crate::raster::RasterImage;
use crate::visual::{TextAlign, TextBlock};

const IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const PX_TO_PT: f32 = 0.75;
const HEADING_FONT_SIZE: u8 = 14;
const BAND_FONT_SIZE: u8 = 8;
const TABLE_FONT_SIZE: u8 = 9;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn natural_width_mm(image: &RasterImage) -> f64 {
    MM_PER_INCH * f64::from(image.pixel_width()) / IMAGE_DPI
}

/// Renders `document` into PDF bytes using the bundled font family.
pub fn render_pdf(document: &Document) -> Result<Vec<u8>, ReportError> {
    let font_family = fonts::default_font_family().map_err(ReportError::Fonts)?;
    let layout = document.layout();

    let mut pdf = genpdf::Document::new(font_family);
    pdf.set_title(document.title());
    pdf.set_paper_size(Size::new(
        mm_from_f64(layout.page_width_mm()),
        mm_from_f64(layout.page_height_mm()),
    ));
    pdf.set_page_decorator(StampedPageDecorator {
        page: 0,
        margins: Margins::all(mm_from_f64(layout.margin_mm())),
        title: document.title().to_string(),
        header_band: mm_from_f64(layout.header_band_mm()),
        footer_band: mm_from_f64(layout.footer_band_mm()),
        footers: document
            .pages()
            .iter()
            .map(|page| page.footer().unwrap_or_default().to_string())
            .collect(),
    });

    let page_count = document.page_count();
    for (index, page) in document.pages().iter().enumerate() {
        for item in page.items() {
            pdf.push(element_for(item).map_err(ReportError::Render)?);
        }
        if index + 1 < page_count {
            pdf.push(PageBreak::new());
        }
    }

    let mut bytes = Vec::new();
    pdf.render(&mut bytes).map_err(ReportError::Render)?;
    Ok(bytes)
}

fn element_for(item: &PlacedContent) -> Result<LinearLayout, Error> {
    let mut layout = LinearLayout::vertical();
    match &item.content {
        PageContent::Branding { primary, secondary } => {
            layout.push(branding(primary.as_ref(), secondary.as_ref(), item.height_mm)?);
        }
        PageContent::Heading(text) => layout.push(
            Paragraph::new(text.as_str())
                .styled(Style::new().bold().with_font_size(HEADING_FONT_SIZE)),
        ),
        PageContent::Text {
            image: Some(image), ..
        }
        | PageContent::Image(image) => {
            layout.push(scaled_image(image, item.width_mm, Alignment::Center)?);
        }
        PageContent::Text { block, image: None } => layout.push(native_text(block)),
        PageContent::Table(table) => match table.image() {
            Some(image) => layout.push(scaled_image(image, item.width_mm, Alignment::Center)?),
            None => layout.push(native_table(table)?),
        },
        PageContent::Placeholder(text) => {
            let mut paragraph = Paragraph::new(text.as_str());
            paragraph.set_alignment(Alignment::Center);
            layout.push(Break::new(2));
            layout.push(paragraph.styled(Style::new().italic()));
        }
    }
    layout.push(Break::new(0.5));
    Ok(layout)
}

fn scaled_image(image: &RasterImage, width_mm: f64, alignment: Alignment) -> Result<Image, Error> {
    let decoded = image
        .decode_rgb()
        .context("Failed to decode captured bitmap")?;
    let mut element = Image::from_dynamic_image(decoded)?;
    let natural = natural_width_mm(image);
    if natural > f64::EPSILON {
        let scale = width_mm / natural;
        element.set_scale(Scale::new(scale, scale));
    }
    element.set_alignment(alignment);
    Ok(element)
}

fn branding(
    primary: Option<&RasterImage>,
    secondary: Option<&RasterImage>,
    max_height_mm: f64,
) -> Result<TableLayout, Error> {
    let width_for = |image: &RasterImage| {
        max_height_mm * f64::from(image.pixel_width()) / f64::from(image.pixel_height().max(1))
    };
    let mut table = TableLayout::new(vec![1, 1]);
    let mut row = table.row();
    row = match primary {
        Some(image) => row.element(scaled_image(image, width_for(image), Alignment::Left)?),
        None => row.element(Break::new(0)),
    };
    row = match secondary {
        Some(image) => row.element(scaled_image(image, width_for(image), Alignment::Right)?),
        None => row.element(Break::new(0)),
    };
    row.push()?;
    Ok(table)
}

fn native_text(block: &TextBlock) -> LinearLayout {
    let size = (block.font_size_px() * PX_TO_PT).round().clamp(4.0, 72.0) as u8;
    let [r, g, b] = block.color();
    let mut style = Style::new()
        .with_font_size(size)
        .with_color(Color::Rgb(r, g, b));
    if block.is_bold() {
        style = style.bold();
    }
    let alignment = match block.align() {
        TextAlign::Left => Alignment::Left,
        TextAlign::Center => Alignment::Center,
        TextAlign::Right => Alignment::Right,
    };

    let mut layout = LinearLayout::vertical();
    for line in block.text().lines() {
        let mut paragraph = Paragraph::new(line);
        paragraph.set_alignment(alignment);
        layout.push(paragraph.styled(style));
    }
    layout
}

fn native_table(table: &TablePage) -> Result<TableLayout, Error> {
    let columns = table.headers().len().max(1);
    let mut layout = TableLayout::new(vec![1; columns]);
    layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    if !table.headers().is_empty() {
        let header_style = Style::new().bold().with_font_size(TABLE_FONT_SIZE);
        let mut header = layout.row();
        for label in table.headers() {
            header = header.element(
                Paragraph::new(label.as_str())
                    .styled(header_style)
                    .padded(1),
            );
        }
        header.push()?;
    }

    let body_style = Style::new().with_font_size(TABLE_FONT_SIZE);
    for cells in table.rows() {
        let mut row = layout.row();
        for index in 0..columns {
            let text = cells.get(index).map(String::as_str).unwrap_or_default();
            row = row.element(Paragraph::new(text).styled(body_style).padded(1));
        }
        row.push()?;
    }
    Ok(layout)
}

/// Applies page margins, the running title header and the stamped page footer.
struct StampedPageDecorator {
    page: usize,
    margins: Margins,
    title: String,
    header_band: Mm,
    footer_band: Mm,
    footers: Vec<String>,
}

impl PageDecorator for StampedPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        area.add_margins(self.margins);

        let mut header = Paragraph::new(self.title.as_str());
        header.set_alignment(Alignment::Right);
        let mut header = header.styled(
            Style::new()
                .with_font_size(BAND_FONT_SIZE)
                .with_color(Color::Greyscale(110)),
        );
        let result = header.render(context, area.clone(), style)?;
        area.add_offset(Position::new(0, result.size.height.max(self.header_band)));

        let available = area.size().height;
        if self.footer_band > available {
            return Err(Error::new(
                "Footer height exceeds available space",
                ErrorKind::InvalidData,
            ));
        }

        let stamped = self.footers.get(self.page - 1);
        if stamped.is_none() {
            warn!(
                "Physical page {} exceeds the {} modelled pages and carries no footer",
                self.page,
                self.footers.len()
            );
        }
        if let Some(text) = stamped {
            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - self.footer_band));
            let mut footer = Paragraph::new(text.as_str());
            footer.set_alignment(Alignment::Center);
            let mut footer = footer.styled(Style::new().with_font_size(BAND_FONT_SIZE));
            let result = footer.render(context, footer_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "Footer element does not fit into the reserved space",
                    ErrorKind::PageSizeExceeded,
                ));
            }
        }
        area.set_height(available - self.footer_band);

        Ok(area)
    }
}
