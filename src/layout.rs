//! Page geometry.
//!
//! [`fit`] scales an image into a bounded region without distorting it. [`PageLayout`] holds the
//! fixed page metrics of a document; all values are millimetres.

use crate::error::LayoutError;

/// A4 portrait width.
pub const A4_WIDTH_MM: f64 = 210.0;
/// A4 portrait height.
pub const A4_HEIGHT_MM: f64 = 297.0;

const DEFAULT_MARGIN_MM: f64 = 20.0;
const DEFAULT_HEADER_BAND_MM: f64 = 8.0;
const DEFAULT_FOOTER_BAND_MM: f64 = 8.0;

/// Fixed page metrics shared by every page of a document.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    page_width_mm: f64,
    page_height_mm: f64,
    margin_mm: f64,
    header_band_mm: f64,
    footer_band_mm: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4_portrait()
    }
}

impl PageLayout {
    /// A4 portrait with 20mm margins.
    pub fn a4_portrait() -> Self {
        Self {
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            margin_mm: DEFAULT_MARGIN_MM,
            header_band_mm: DEFAULT_HEADER_BAND_MM,
            footer_band_mm: DEFAULT_FOOTER_BAND_MM,
        }
    }

    /// Sets the margin applied on all four sides.
    pub fn with_margin_mm(mut self, margin_mm: f64) -> Self {
        self.margin_mm = margin_mm;
        self
    }

    /// Sets the height reserved for the running header.
    pub fn with_header_band_mm(mut self, header_band_mm: f64) -> Self {
        self.header_band_mm = header_band_mm;
        self
    }

    /// Sets the height reserved for the page-number footer.
    pub fn with_footer_band_mm(mut self, footer_band_mm: f64) -> Self {
        self.footer_band_mm = footer_band_mm;
        self
    }

    /// Full paper width.
    pub fn page_width_mm(&self) -> f64 {
        self.page_width_mm
    }

    /// Full paper height.
    pub fn page_height_mm(&self) -> f64 {
        self.page_height_mm
    }

    /// Margin on each side.
    pub fn margin_mm(&self) -> f64 {
        self.margin_mm
    }

    /// Height of the running header band.
    pub fn header_band_mm(&self) -> f64 {
        self.header_band_mm
    }

    /// Height of the footer band.
    pub fn footer_band_mm(&self) -> f64 {
        self.footer_band_mm
    }

    /// Width available between the side margins.
    pub fn content_width_mm(&self) -> f64 {
        (self.page_width_mm - 2.0 * self.margin_mm).max(0.0)
    }

    /// Height available between the top and bottom margins.
    pub fn content_height_mm(&self) -> f64 {
        (self.page_height_mm - 2.0 * self.margin_mm).max(0.0)
    }

    /// Height left for body content once the header and footer bands are reserved.
    pub fn body_height_mm(&self) -> f64 {
        (self.content_height_mm() - self.header_band_mm - self.footer_band_mm).max(0.0)
    }

    /// Fits an image into `max_width_mm` x `max_height_mm` and centres it on this layout.
    pub fn fit(
        &self,
        intrinsic_width: u32,
        intrinsic_height: u32,
        max_width_mm: f64,
        max_height_mm: f64,
    ) -> Result<Placement, LayoutError> {
        fit(
            intrinsic_width,
            intrinsic_height,
            max_width_mm,
            max_height_mm,
            self.content_width_mm(),
        )
    }
}

/// The size and horizontal offset of a fitted image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Rendered width.
    pub width_mm: f64,
    /// Rendered height.
    pub height_mm: f64,
    /// Offset from the left content edge that centres the image.
    pub x_offset_mm: f64,
}

/// Scales an image to the largest size that fits the region while keeping its aspect ratio.
///
/// The width is tried first; when the derived height overflows `max_height_mm` the height becomes
/// the binding dimension. `content_width_mm` is the width the image is centred in. Zero intrinsic
/// dimensions are rejected.
pub fn fit(
    intrinsic_width: u32,
    intrinsic_height: u32,
    max_width_mm: f64,
    max_height_mm: f64,
    content_width_mm: f64,
) -> Result<Placement, LayoutError> {
    if intrinsic_width == 0 || intrinsic_height == 0 {
        return Err(LayoutError::DegenerateImage {
            width: intrinsic_width,
            height: intrinsic_height,
        });
    }
    let region_ok = |value: f64| value.is_finite() && value > 0.0;
    if !region_ok(max_width_mm) || !region_ok(max_height_mm) {
        return Err(LayoutError::InvalidRegion {
            width_mm: max_width_mm,
            height_mm: max_height_mm,
        });
    }

    let aspect = f64::from(intrinsic_width) / f64::from(intrinsic_height);
    let mut width_mm = max_width_mm;
    let mut height_mm = width_mm / aspect;
    if height_mm > max_height_mm {
        height_mm = max_height_mm;
        width_mm = height_mm * aspect;
    }

    Ok(Placement {
        width_mm,
        height_mm,
        x_offset_mm: (content_width_mm - width_mm) / 2.0,
    })
}
