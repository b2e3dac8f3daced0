//! The default staging backend: an in-memory canvas drawn with `rusttype` glyphs.
//!
//! Mounting lays a visual out into a retained list of draw operations at the base width.
//! Capturing replays those operations onto an opaque canvas scaled to the requested density.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use crate::error::CaptureError;
use crate::fonts;
use crate::visual::{
    Rgb, StageElement, TableVisual, TextAlign, TextBlock, VisualSpec, GRID, HEADER_FILL, INK,
    STRIPE_FILL,
};

use super::OPAQUE_BACKGROUND;

const PADDING_PX: f32 = 12.0;
const CELL_PADDING_PX: f32 = 8.0;
const LINE_SPACING: f32 = 1.4;
const ELLIPSIS: char = '\u{2026}';

/// Largest canvas a single capture may allocate, in pixels.
pub const MAX_CANVAS_PIXELS: f64 = 64_000_000.0;

/// Regular and bold faces used to draw text.
pub struct GlyphFonts {
    regular: Font<'static>,
    bold: Font<'static>,
}

impl GlyphFonts {
    /// Parses the two faces from TrueType bytes.
    pub fn from_bytes(regular: Vec<u8>, bold: Vec<u8>) -> Option<Self> {
        Some(Self {
            regular: Font::try_from_vec(regular)?,
            bold: Font::try_from_vec(bold)?,
        })
    }

    fn face(&self, bold: bool) -> &Font<'static> {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

fn text_width(font: &Font<'static>, px: f32, text: &str) -> f32 {
    font.layout(text, Scale::uniform(px), point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

fn wrap_lines(font: &Font<'static>, px: f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_owned()
            } else {
                format!("{} {}", current, word)
            };
            if !current.is_empty() && text_width(font, px, &candidate) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_owned()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

fn truncate_to_width(font: &Font<'static>, px: f32, text: &str, max_width: f32) -> String {
    if text_width(font, px, text) <= max_width {
        return text.to_owned();
    }
    let mut truncated: String = text.to_owned();
    while !truncated.is_empty() {
        truncated.pop();
        let candidate = format!("{}{}", truncated.trim_end(), ELLIPSIS);
        if text_width(font, px, &candidate) <= max_width {
            return candidate;
        }
    }
    String::new()
}

enum DrawOp {
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgb,
        text: String,
    },
    Element(Arc<dyn StageElement + Send + Sync>),
}

struct Scene {
    width_px: u32,
    height_px: u32,
    ops: Vec<DrawOp>,
}

/// Off-screen canvas painted over [`OPAQUE_BACKGROUND`].
pub struct SoftwareStage {
    fonts: GlyphFonts,
    scene: Option<Scene>,
}

impl SoftwareStage {
    /// Creates a stage drawing with `fonts` on a white background.
    pub fn new(fonts: GlyphFonts) -> Self {
        Self {
            fonts,
            scene: None,
        }
    }

    /// Creates a stage using the bundled font files.
    pub fn with_bundled_fonts() -> Result<Self, genpdf::error::Error> {
        Ok(Self::new(fonts::glyph_fonts()?))
    }

    fn layout_text(&self, block: &TextBlock, width_px: u32) -> Scene {
        let font = self.fonts.face(block.is_bold());
        let size = block.font_size_px();
        let inner_width = width_px as f32 - 2.0 * PADDING_PX;
        let line_height = size * LINE_SPACING;

        let mut ops = Vec::new();
        let mut y = PADDING_PX;
        for line in wrap_lines(font, size, block.text(), inner_width) {
            let width = text_width(font, size, &line);
            let x = match block.align() {
                TextAlign::Left => PADDING_PX,
                TextAlign::Center => PADDING_PX + (inner_width - width).max(0.0) / 2.0,
                TextAlign::Right => PADDING_PX + (inner_width - width).max(0.0),
            };
            ops.push(DrawOp::Text {
                x,
                y: y + (line_height - size) / 2.0,
                size,
                bold: block.is_bold(),
                color: block.color(),
                text: line,
            });
            y += line_height;
        }

        Scene {
            width_px,
            height_px: (y + PADDING_PX).ceil() as u32,
            ops,
        }
    }

    fn layout_table(&self, table: &TableVisual, width_px: u32) -> Result<Scene, CaptureError> {
        let columns = table.column_count();
        if columns == 0 {
            return Err(CaptureError::Mount("table has no columns".into()));
        }

        let size = table.font_size_px();
        let inner_width = width_px as f32 - 2.0 * PADDING_PX;
        let column_width = inner_width / columns as f32;
        let row_height = size * LINE_SPACING + 2.0 * CELL_PADDING_PX;
        let text_room = column_width - 2.0 * CELL_PADDING_PX;
        let row_count = table.rows().len() + 1;
        let table_height = row_height * row_count as f32;

        let mut ops = vec![DrawOp::Fill {
            x: PADDING_PX,
            y: PADDING_PX,
            width: inner_width,
            height: row_height,
            color: HEADER_FILL,
        }];

        let header = std::iter::once((true, table.headers()));
        let body = table.rows().iter().map(|row| (false, row.as_slice()));
        for (index, (is_header, cells)) in header.chain(body).enumerate() {
            let top = PADDING_PX + row_height * index as f32;
            if !is_header && index % 2 == 0 {
                ops.push(DrawOp::Fill {
                    x: PADDING_PX,
                    y: top,
                    width: inner_width,
                    height: row_height,
                    color: STRIPE_FILL,
                });
            }
            let font = self.fonts.face(is_header);
            for (column, cell) in cells.iter().enumerate() {
                ops.push(DrawOp::Text {
                    x: PADDING_PX + column_width * column as f32 + CELL_PADDING_PX,
                    y: top + CELL_PADDING_PX + (size * LINE_SPACING - size) / 2.0,
                    size,
                    bold: is_header,
                    color: INK,
                    text: truncate_to_width(font, size, cell, text_room),
                });
            }
        }

        for row in 0..=row_count {
            ops.push(DrawOp::Fill {
                x: PADDING_PX,
                y: PADDING_PX + row_height * row as f32,
                width: inner_width,
                height: 1.0,
                color: GRID,
            });
        }
        for column in 0..=columns {
            ops.push(DrawOp::Fill {
                x: PADDING_PX + column_width * column as f32,
                y: PADDING_PX,
                width: 1.0,
                height: table_height,
                color: GRID,
            });
        }

        Ok(Scene {
            width_px,
            height_px: (table_height + 2.0 * PADDING_PX).ceil() as u32,
            ops,
        })
    }

    fn paint(&self, scene: &Scene, scale: f32) -> Result<RgbaImage, CaptureError> {
        let width = (f64::from(scene.width_px) * f64::from(scale)).ceil();
        let height = (f64::from(scene.height_px) * f64::from(scale)).ceil();
        if !(width >= 1.0 && height >= 1.0) {
            return Err(CaptureError::Capture(format!(
                "staged element has no area ({}x{})",
                width, height
            )));
        }
        if width * height > MAX_CANVAS_PIXELS {
            return Err(CaptureError::Capture(format!(
                "canvas of {}x{} px exceeds the {} px budget",
                width, height, MAX_CANVAS_PIXELS
            )));
        }
        let (width, height) = (width as u32, height as u32);

        let [r, g, b] = OPAQUE_BACKGROUND;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
        for op in &scene.ops {
            match op {
                DrawOp::Fill {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => fill_rect(
                    &mut canvas,
                    x * scale,
                    y * scale,
                    (width * scale).max(1.0),
                    (height * scale).max(1.0),
                    *color,
                ),
                DrawOp::Text {
                    x,
                    y,
                    size,
                    bold,
                    color,
                    text,
                } => draw_text(
                    &mut canvas,
                    self.fonts.face(*bold),
                    size * scale,
                    x * scale,
                    y * scale,
                    *color,
                    text,
                ),
                DrawOp::Element(element) => element.paint(&mut canvas, scale)?,
            }
        }
        Ok(canvas)
    }
}

impl super::StagingBackend for SoftwareStage {
    fn mount(&mut self, visual: &VisualSpec, base_width_px: u32) -> Result<(), CaptureError> {
        if self.scene.is_some() {
            return Err(CaptureError::Mount("staging area is already occupied".into()));
        }
        if base_width_px as f32 <= 2.0 * PADDING_PX {
            return Err(CaptureError::Mount(format!(
                "base width {}px leaves no room for content",
                base_width_px
            )));
        }

        let scene = match visual {
            VisualSpec::Text(block) => self.layout_text(block, base_width_px),
            VisualSpec::Table(table) => self.layout_table(table, base_width_px)?,
            VisualSpec::Element(element) => Scene {
                width_px: base_width_px,
                height_px: element.height_px(base_width_px),
                ops: vec![DrawOp::Element(Arc::clone(element))],
            },
        };
        self.scene = Some(scene);
        Ok(())
    }

    fn capture(&mut self, scale: f32) -> Result<RgbaImage, CaptureError> {
        let scene = self
            .scene
            .as_ref()
            .ok_or_else(|| CaptureError::Capture("nothing is mounted".into()))?;
        self.paint(scene, scale)
    }

    fn unmount(&mut self) {
        self.scene = None;
    }

    fn is_mounted(&self) -> bool {
        self.scene.is_some()
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
    let x0 = x.max(0.0).round() as u32;
    let y0 = y.max(0.0).round() as u32;
    let x1 = ((x + width).round().max(0.0) as u32).min(canvas.width());
    let y1 = ((y + height).round().max(0.0) as u32).min(canvas.height());
    let [r, g, b] = color;
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, Rgba([r, g, b, 255]));
        }
    }
}

fn draw_text(
    canvas: &mut RgbaImage,
    font: &Font<'static>,
    px: f32,
    x: f32,
    y: f32,
    color: Rgb,
    text: &str,
) {
    let scale = Scale::uniform(px);
    let ascent = font.v_metrics(scale).ascent;
    for glyph in font.layout(text, scale, point(x, y + ascent)) {
        let Some(bounds) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bounds.min.x;
            let py = gy as i32 + bounds.min.y;
            if px < 0 || py < 0 || px as u32 >= canvas.width() || py as u32 >= canvas.height() {
                return;
            }
            if coverage <= 0.0 {
                return;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            let inv = 1.0 - coverage;
            for channel in 0..3 {
                dst.0[channel] =
                    (f32::from(color[channel]) * coverage + f32::from(dst.0[channel]) * inv) as u8;
            }
            dst.0[3] = 255;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::StagingBackend;

    struct Swatch;

    impl StageElement for Swatch {
        fn height_px(&self, width_px: u32) -> u32 {
            width_px / 4
        }

        fn paint(&self, canvas: &mut RgbaImage, _scale: f32) -> Result<(), CaptureError> {
            canvas.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
            Ok(())
        }
    }

    fn stage() -> Option<SoftwareStage> {
        match SoftwareStage::with_bundled_fonts() {
            Ok(stage) => Some(stage),
            Err(err) => {
                eprintln!("Skipping software stage test: {}", err);
                None
            }
        }
    }

    #[test]
    fn capture_scales_with_density() {
        let Some(mut stage) = stage() else {
            return;
        };
        let table = TableVisual::new(
            vec!["Dept".into(), "Open".into()],
            vec![vec!["Finance".into(), "3".into()]; 4],
        );
        stage.mount(&table.into(), 400).unwrap();
        let one = stage.capture(1.0).unwrap();
        let two = stage.capture(2.0).unwrap();
        stage.unmount();

        assert_eq!(one.width(), 400);
        assert_eq!(two.width(), 800);
        assert!(two.height() >= one.height() * 2 - 1);
        assert!(!stage.is_mounted());
    }

    #[test]
    fn second_mount_is_refused() {
        let Some(mut stage) = stage() else {
            return;
        };
        let text: VisualSpec = TextBlock::new("Title").bold().into();
        stage.mount(&text, 400).unwrap();
        assert!(stage.mount(&text, 400).is_err());
        stage.unmount();
        assert!(stage.mount(&text, 400).is_ok());
    }

    #[test]
    fn long_text_wraps_onto_more_lines() {
        let Some(mut stage) = stage() else {
            return;
        };
        let short: VisualSpec = TextBlock::new("Short").into();
        let long: VisualSpec = TextBlock::new("word ".repeat(80)).into();

        stage.mount(&short, 300).unwrap();
        let short_height = stage.capture(1.0).unwrap().height();
        stage.unmount();
        stage.mount(&long, 300).unwrap();
        let long_height = stage.capture(1.0).unwrap().height();
        stage.unmount();

        assert!(long_height > short_height * 3);
    }

    #[test]
    fn elements_paint_themselves() {
        let Some(mut stage) = stage() else {
            return;
        };
        stage
            .mount(&VisualSpec::Element(Arc::new(Swatch)), 400)
            .unwrap();
        let pixels = stage.capture(1.0).unwrap();
        assert_eq!(pixels.dimensions(), (400, 100));
        assert_eq!(pixels.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn oversized_canvas_is_refused() {
        let Some(stage) = stage() else {
            return;
        };
        let mut rasterizer = crate::raster::Rasterizer::new(stage).with_base_width(400);
        let swatch = VisualSpec::Element(Arc::new(Swatch));

        assert!(rasterizer.rasterize(&swatch, 1000.0).is_none());
        assert!(!rasterizer.is_staging_occupied());
        assert!(rasterizer.rasterize(&swatch, 2.0).is_some());
    }

    #[test]
    fn capture_without_mount_fails() {
        let Some(mut stage) = stage() else {
            return;
        };
        assert!(stage.capture(1.0).is_err());
    }
}
