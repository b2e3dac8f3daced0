//! Capturing live chart widgets.
//!
//! A chart is captured by trying a fixed list of [`CaptureStrategy`] values in order. A strategy
//! either produces an image, reports that it does not apply to the chart, or fails; only the
//! first image counts. Every inapplicable or failed tier is logged under its own name.

use std::fmt;

use image::RgbaImage;
use log::{debug, warn};

use crate::error::CaptureError;
use crate::raster::{RasterImage, Rasterizer, OPAQUE_BACKGROUND};
use crate::visual::{Rgb, VisualSpec};

/// Options for the best-effort whole-element capture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotOptions {
    /// Pixel density of the snapshot.
    pub scale: f32,
    /// Background painted under transparent regions.
    pub background: Rgb,
    /// Continue past sub-elements that fail to draw instead of failing the snapshot.
    pub ignore_element_errors: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: OPAQUE_BACKGROUND,
            ignore_element_errors: true,
        }
    }
}

/// A live chart widget owned by the host application.
///
/// The three capture hooks return `Ok(None)` when they do not apply to the widget.
pub trait ChartHandle {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Switches the widget to another data view. Rendering may complete later.
    fn select_view(&self, _view: &str) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Blocks until the widget reports that its current view has finished rendering.
    fn wait_until_settled(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// The widget's rendered pixels, when it exposes them directly.
    fn surface(&self) -> Result<Option<RgbaImage>, CaptureError> {
        Ok(None)
    }

    /// The widget's container as something the staging area can mount.
    fn container(&self) -> Option<VisualSpec> {
        None
    }

    /// A lower-fidelity screenshot of the whole element.
    fn snapshot(&self, _options: &SnapshotOptions) -> Result<Option<RgbaImage>, CaptureError> {
        Ok(None)
    }
}

/// One way of turning a chart into a bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// Copy the rendered surface onto an opaque canvas.
    DirectPixelCopy,
    /// Mount the chart container in the staging area.
    StagedCapture,
    /// Screenshot the whole element with relaxed options.
    FullElementCapture,
}

impl CaptureStrategy {
    /// Every strategy, most faithful first.
    pub const ORDER: [CaptureStrategy; 3] = [
        CaptureStrategy::DirectPixelCopy,
        CaptureStrategy::StagedCapture,
        CaptureStrategy::FullElementCapture,
    ];

    fn attempt(
        self,
        chart: &dyn ChartHandle,
        rasterizer: &mut Rasterizer,
        scale: f32,
        snapshot: &SnapshotOptions,
    ) -> Result<Option<RasterImage>, CaptureError> {
        match self {
            CaptureStrategy::DirectPixelCopy => match chart.surface()? {
                Some(pixels) => RasterImage::from_rgba(&pixels).map(Some),
                None => Ok(None),
            },
            CaptureStrategy::StagedCapture => match chart.container() {
                Some(container) => rasterizer.rasterize(&container, scale).map(Some).ok_or_else(
                    || CaptureError::Capture("staged capture of chart container failed".into()),
                ),
                None => Ok(None),
            },
            CaptureStrategy::FullElementCapture => match chart.snapshot(snapshot)? {
                Some(pixels) => RasterImage::from_rgba(&pixels).map(Some),
                None => Ok(None),
            },
        }
    }
}

impl fmt::Display for CaptureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureStrategy::DirectPixelCopy => "direct pixel copy",
            CaptureStrategy::StagedCapture => "staged capture",
            CaptureStrategy::FullElementCapture => "full-element capture",
        })
    }
}

/// Captures charts through an ordered fallback chain.
#[derive(Clone, Debug)]
pub struct ChartCapturer {
    strategies: Vec<CaptureStrategy>,
    snapshot: SnapshotOptions,
}

impl Default for ChartCapturer {
    fn default() -> Self {
        Self {
            strategies: CaptureStrategy::ORDER.to_vec(),
            snapshot: SnapshotOptions::default(),
        }
    }
}

impl ChartCapturer {
    /// Creates a capturer using every strategy in [`CaptureStrategy::ORDER`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts or reorders the strategies and returns the updated capturer.
    pub fn with_strategies(mut self, strategies: impl Into<Vec<CaptureStrategy>>) -> Self {
        self.strategies = strategies.into();
        self
    }

    /// Sets the snapshot options used by the last-resort tier.
    pub fn with_snapshot_options(mut self, snapshot: SnapshotOptions) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Returns the strategies in the order they are tried.
    pub fn strategies(&self) -> &[CaptureStrategy] {
        &self.strategies
    }

    /// Captures `chart`, returning `None` once every strategy is exhausted.
    pub fn capture(
        &self,
        chart: &dyn ChartHandle,
        rasterizer: &mut Rasterizer,
        scale: f32,
    ) -> Option<RasterImage> {
        for strategy in &self.strategies {
            match strategy.attempt(chart, rasterizer, scale, &self.snapshot) {
                Ok(Some(image)) => {
                    debug!("Captured chart '{}' via {}", chart.name(), strategy);
                    return Some(image);
                }
                Ok(None) => debug!("{} does not apply to chart '{}'", strategy, chart.name()),
                Err(err) => warn!(
                    "{} failed for chart '{}': {}",
                    strategy,
                    chart.name(),
                    err
                ),
            }
        }
        warn!(
            "All capture strategies exhausted for chart '{}'",
            chart.name()
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use image::Rgba;

    use super::*;
    use crate::raster::tests::ScriptedStage;
    use crate::visual::TextBlock;

    #[derive(Default)]
    struct FakeChart {
        surface: Option<Result<RgbaImage, ()>>,
        container: bool,
        snapshot: Option<Result<RgbaImage, ()>>,
        snapshot_calls: Cell<u32>,
    }

    impl ChartHandle for FakeChart {
        fn name(&self) -> &str {
            "fake"
        }

        fn surface(&self) -> Result<Option<RgbaImage>, CaptureError> {
            match &self.surface {
                Some(Ok(pixels)) => Ok(Some(pixels.clone())),
                Some(Err(())) => Err(CaptureError::Surface("tainted canvas".into())),
                None => Ok(None),
            }
        }

        fn container(&self) -> Option<VisualSpec> {
            self.container
                .then(|| TextBlock::new("chart container").into())
        }

        fn snapshot(&self, _options: &SnapshotOptions) -> Result<Option<RgbaImage>, CaptureError> {
            self.snapshot_calls.set(self.snapshot_calls.get() + 1);
            match &self.snapshot {
                Some(Ok(pixels)) => Ok(Some(pixels.clone())),
                Some(Err(())) => Err(CaptureError::Capture("snapshot crashed".into())),
                None => Ok(None),
            }
        }
    }

    fn pixels(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 128]))
    }

    fn rasterizer(fail_capture: bool) -> Rasterizer {
        Rasterizer::new(ScriptedStage {
            fail_capture,
            ..ScriptedStage::default()
        })
    }

    #[test]
    fn direct_surface_wins() {
        let chart = FakeChart {
            surface: Some(Ok(pixels(64, 32))),
            snapshot: Some(Ok(pixels(8, 8))),
            ..FakeChart::default()
        };
        let image = ChartCapturer::new()
            .capture(&chart, &mut rasterizer(false), 2.0)
            .unwrap();
        assert_eq!((image.pixel_width(), image.pixel_height()), (64, 32));
        assert_eq!(chart.snapshot_calls.get(), 0);
    }

    #[test]
    fn failing_surface_falls_back_to_staging() {
        let chart = FakeChart {
            surface: Some(Err(())),
            container: true,
            ..FakeChart::default()
        };
        let image = ChartCapturer::new()
            .capture(&chart, &mut rasterizer(false), 2.0)
            .unwrap();
        // ScriptedStage produces 20*scale x 10*scale bitmaps.
        assert_eq!((image.pixel_width(), image.pixel_height()), (40, 20));
    }

    #[test]
    fn failed_staging_falls_back_to_snapshot() {
        let chart = FakeChart {
            container: true,
            snapshot: Some(Ok(pixels(12, 6))),
            ..FakeChart::default()
        };
        let image = ChartCapturer::new()
            .capture(&chart, &mut rasterizer(true), 2.0)
            .unwrap();
        assert_eq!((image.pixel_width(), image.pixel_height()), (12, 6));
        assert_eq!(chart.snapshot_calls.get(), 1);
    }

    #[test]
    fn exhausted_chain_returns_none() {
        let chart = FakeChart {
            surface: Some(Err(())),
            snapshot: Some(Err(())),
            ..FakeChart::default()
        };
        assert!(ChartCapturer::new()
            .capture(&chart, &mut rasterizer(false), 2.0)
            .is_none());
    }

    #[test]
    fn strategies_can_be_restricted() {
        let chart = FakeChart {
            surface: Some(Ok(pixels(4, 4))),
            snapshot: Some(Ok(pixels(8, 8))),
            ..FakeChart::default()
        };
        let capturer =
            ChartCapturer::new().with_strategies(vec![CaptureStrategy::FullElementCapture]);
        let image = capturer
            .capture(&chart, &mut rasterizer(false), 1.0)
            .unwrap();
        assert_eq!(image.pixel_width(), 8);
        assert_eq!(capturer.strategies(), &[CaptureStrategy::FullElementCapture]);
    }

    /// Only produces a snapshot when sub-element errors are not ignored.
    struct StrictSnapshotChart;

    impl ChartHandle for StrictSnapshotChart {
        fn name(&self) -> &str {
            "strict"
        }

        fn snapshot(&self, options: &SnapshotOptions) -> Result<Option<RgbaImage>, CaptureError> {
            if options.ignore_element_errors {
                return Err(CaptureError::Capture("lenient snapshot refused".into()));
            }
            let side = (4.0 * options.scale) as u32;
            Ok(Some(RgbaImage::from_pixel(side, side, Rgba([0, 0, 0, 255]))))
        }
    }

    #[test]
    fn snapshot_tier_uses_configured_options() {
        let capturer = ChartCapturer::new().with_snapshot_options(SnapshotOptions {
            scale: 3.0,
            ignore_element_errors: false,
            ..SnapshotOptions::default()
        });
        let image = capturer
            .capture(&StrictSnapshotChart, &mut rasterizer(false), 2.0)
            .unwrap();
        assert_eq!(image.pixel_width(), 12);
        assert!(ChartCapturer::new()
            .capture(&StrictSnapshotChart, &mut rasterizer(false), 2.0)
            .is_none());
    }
}
