//! Off-screen rasterization of visual elements.
//!
//! A [`Rasterizer`] owns one [`StagingBackend`], the surface a [`VisualSpec`] is mounted on
//! before it is captured. The staging area is process-wide and not reentrant: every
//! [`Rasterizer::rasterize`] call holds [`STAGING_AREA`] for its whole mount/capture/unmount
//! sequence, and the mount is released by a guard so no exit path leaves an element behind.

pub mod software;

use std::io::Cursor;
use std::sync::{Mutex, PoisonError};

use image::{DynamicImage, ImageOutputFormat, RgbImage, RgbaImage};
use log::{debug, warn};

use crate::error::CaptureError;
use crate::visual::{Rgb, VisualSpec};

pub use software::{GlyphFonts, SoftwareStage};

/// Default width of the staging area in base pixels.
pub const DEFAULT_BASE_WIDTH_PX: u32 = 800;

/// White, the opaque background every capture is composited over.
pub const OPAQUE_BACKGROUND: Rgb = [255, 255, 255];

/// Serializes access to the staging area across the whole process.
static STAGING_AREA: Mutex<()> = Mutex::new(());

/// An encoded, opaque bitmap ready for placement.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixel_width: u32,
    pixel_height: u32,
    encoded: Vec<u8>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("pixel_width", &self.pixel_width)
            .field("pixel_height", &self.pixel_height)
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

impl RasterImage {
    /// Composites `pixels` over [`OPAQUE_BACKGROUND`] and encodes the result as PNG.
    pub fn from_rgba(pixels: &RgbaImage) -> Result<Self, CaptureError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::Capture(format!(
                "captured bitmap is empty ({}x{})",
                width, height
            )));
        }
        let opaque = flatten_onto(pixels, OPAQUE_BACKGROUND);
        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(opaque)
            .write_to(&mut Cursor::new(&mut encoded), ImageOutputFormat::Png)?;
        Ok(Self {
            pixel_width: width,
            pixel_height: height,
            encoded,
        })
    }

    /// Intrinsic width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    /// Intrinsic height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    /// The encoded bitmap.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Decodes the bitmap into an RGB image without alpha.
    pub fn decode_rgb(&self) -> Result<DynamicImage, image::ImageError> {
        let decoded = image::load_from_memory(&self.encoded)?;
        Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
    }
}

/// Copies `pixels` onto a fresh opaque surface of the same size.
pub fn flatten_onto(pixels: &RgbaImage, background: Rgb) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let alpha = f32::from(a) / 255.0;
        let blend = |channel: u8, base: u8| {
            (f32::from(channel) * alpha + f32::from(base) * (1.0 - alpha)).round() as u8
        };
        image::Rgb([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
        ])
    })
}

/// A surface that can hold one mounted visual element at a time.
pub trait StagingBackend {
    /// Lays `visual` out at `base_width_px` and keeps it mounted.
    fn mount(&mut self, visual: &VisualSpec, base_width_px: u32) -> Result<(), CaptureError>;

    /// Captures the mounted element at `scale`x pixel density.
    fn capture(&mut self, scale: f32) -> Result<RgbaImage, CaptureError>;

    /// Removes whatever is mounted. Must be safe to call when nothing is.
    fn unmount(&mut self);

    /// Returns whether an element is currently mounted.
    fn is_mounted(&self) -> bool;
}

/// Keeps a visual mounted for as long as it lives.
struct Mounted<'a> {
    backend: &'a mut dyn StagingBackend,
}

impl<'a> Mounted<'a> {
    fn mount(
        backend: &'a mut dyn StagingBackend,
        visual: &VisualSpec,
        base_width_px: u32,
    ) -> Result<Self, CaptureError> {
        // Construct the guard first so a partial mount is also torn down.
        let mut guard = Self { backend };
        guard.backend.mount(visual, base_width_px)?;
        Ok(guard)
    }

    fn capture(&mut self, scale: f32) -> Result<RgbaImage, CaptureError> {
        self.backend.capture(scale)
    }
}

impl Drop for Mounted<'_> {
    fn drop(&mut self) {
        self.backend.unmount();
    }
}

/// Renders visual elements into bitmaps through a staging backend.
pub struct Rasterizer {
    backend: Box<dyn StagingBackend>,
    base_width_px: u32,
}

impl Rasterizer {
    /// Creates a rasterizer over `backend` with the default base width.
    pub fn new(backend: impl StagingBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            base_width_px: DEFAULT_BASE_WIDTH_PX,
        }
    }

    /// Creates a rasterizer drawing with the bundled fonts.
    pub fn with_bundled_fonts() -> Result<Self, genpdf::error::Error> {
        Ok(Self::new(SoftwareStage::with_bundled_fonts()?))
    }

    /// Sets the staging base width and returns the updated rasterizer.
    pub fn with_base_width(mut self, base_width_px: u32) -> Self {
        self.base_width_px = base_width_px;
        self
    }

    /// Sets the staging base width.
    pub fn set_base_width(&mut self, base_width_px: u32) {
        self.base_width_px = base_width_px;
    }

    /// Returns the staging base width.
    pub fn base_width_px(&self) -> u32 {
        self.base_width_px
    }

    /// Returns whether the backend still holds a mounted element.
    pub fn is_staging_occupied(&self) -> bool {
        self.backend.is_mounted()
    }

    /// Renders `visual` at `scale`x density. Failures are logged and reported as `None`.
    pub fn rasterize(&mut self, visual: &VisualSpec, scale: f32) -> Option<RasterImage> {
        match self.try_rasterize(visual, scale) {
            Ok(image) => {
                debug!(
                    "Rasterized {} into {}x{} px",
                    visual.kind(),
                    image.pixel_width(),
                    image.pixel_height()
                );
                Some(image)
            }
            Err(err) => {
                warn!("Failed to rasterize {}: {}", visual.kind(), err);
                None
            }
        }
    }

    fn try_rasterize(
        &mut self,
        visual: &VisualSpec,
        scale: f32,
    ) -> Result<RasterImage, CaptureError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CaptureError::Capture(format!("invalid scale {}", scale)));
        }

        let _staging = STAGING_AREA.lock().unwrap_or_else(PoisonError::into_inner);
        let pixels = {
            let mut mounted = Mounted::mount(self.backend.as_mut(), visual, self.base_width_px)?;
            mounted.capture(scale)?
        };
        RasterImage::from_rgba(&pixels)
    }
}
