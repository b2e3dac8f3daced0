//! Tunables for a report run.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::layout::PageLayout;
use crate::paginate::PaginationPolicy;
use crate::raster::DEFAULT_BASE_WIDTH_PX;

const DEFAULT_CAPTURE_SCALE: f32 = 2.0;
const DEFAULT_CHART_MAX_HEIGHT_MM: f64 = 100.0;
const DEFAULT_LOGO_MAX_HEIGHT_MM: f64 = 18.0;
const DEFAULT_PRIMARY_LOGO: &str = "assets/branding/primary.png";
const DEFAULT_SECONDARY_LOGO: &str = "assets/branding/secondary.png";
const DEFAULT_PLACEHOLDER: &str = "No data available for this section";
const DEFAULT_ALL_PERIODS: &str = "All periods";
const DEFAULT_SUMMARY_TITLE: &str = "Summary";
const DEFAULT_EXTENSION: &str = "pdf";

/// Builder-style configuration consumed by [`crate::compose::ReportComposer`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReportOptions {
    layout: PageLayout,
    pagination: PaginationPolicy,
    capture_scale: f32,
    staging_width_px: u32,
    chart_max_height_mm: f64,
    logo_max_height_mm: f64,
    primary_logo: Option<PathBuf>,
    secondary_logo: Option<PathBuf>,
    placeholder_text: String,
    all_periods_label: String,
    summary_title: String,
    file_extension: String,
    generation_date: Option<NaiveDate>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            layout: PageLayout::a4_portrait(),
            pagination: PaginationPolicy::merging(),
            capture_scale: DEFAULT_CAPTURE_SCALE,
            staging_width_px: DEFAULT_BASE_WIDTH_PX,
            chart_max_height_mm: DEFAULT_CHART_MAX_HEIGHT_MM,
            logo_max_height_mm: DEFAULT_LOGO_MAX_HEIGHT_MM,
            primary_logo: Some(PathBuf::from(DEFAULT_PRIMARY_LOGO)),
            secondary_logo: Some(PathBuf::from(DEFAULT_SECONDARY_LOGO)),
            placeholder_text: DEFAULT_PLACEHOLDER.to_string(),
            all_periods_label: DEFAULT_ALL_PERIODS.to_string(),
            summary_title: DEFAULT_SUMMARY_TITLE.to_string(),
            file_extension: DEFAULT_EXTENSION.to_string(),
            generation_date: None,
        }
    }
}

impl ReportOptions {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page metrics.
    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the table pagination policy.
    pub fn with_pagination(mut self, pagination: PaginationPolicy) -> Self {
        self.pagination = pagination;
        self
    }

    /// Sets the pixel density used for every capture.
    pub fn with_capture_scale(mut self, scale: f32) -> Self {
        self.capture_scale = scale;
        self
    }

    /// Sets the base width of the staging area.
    pub fn with_staging_width_px(mut self, width_px: u32) -> Self {
        self.staging_width_px = width_px;
        self
    }

    /// Sets the maximum height of a chart image.
    pub fn with_chart_max_height_mm(mut self, height_mm: f64) -> Self {
        self.chart_max_height_mm = height_mm;
        self
    }

    /// Sets the maximum height of a branding logo.
    pub fn with_logo_max_height_mm(mut self, height_mm: f64) -> Self {
        self.logo_max_height_mm = height_mm;
        self
    }

    /// Sets or clears the left-hand logo.
    pub fn with_primary_logo(mut self, path: Option<PathBuf>) -> Self {
        self.primary_logo = path;
        self
    }

    /// Sets or clears the right-hand logo.
    pub fn with_secondary_logo(mut self, path: Option<PathBuf>) -> Self {
        self.secondary_logo = path;
        self
    }

    /// Disables the branding phase.
    pub fn without_branding(self) -> Self {
        self.with_primary_logo(None).with_secondary_logo(None)
    }

    /// Sets the text shown for sections without data.
    pub fn with_placeholder_text(mut self, text: impl Into<String>) -> Self {
        self.placeholder_text = text.into();
        self
    }

    /// Sets the label used when the request has no date range.
    pub fn with_all_periods_label(mut self, label: impl Into<String>) -> Self {
        self.all_periods_label = label.into();
        self
    }

    /// Sets the heading above the summary table.
    pub fn with_summary_title(mut self, title: impl Into<String>) -> Self {
        self.summary_title = title.into();
        self
    }

    /// Sets the artifact file extension.
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Pins the date used in the artifact name instead of today.
    pub fn with_generation_date(mut self, date: NaiveDate) -> Self {
        self.generation_date = Some(date);
        self
    }

    /// Page metrics.
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Table pagination policy.
    pub fn pagination(&self) -> &PaginationPolicy {
        &self.pagination
    }

    /// Capture pixel density.
    pub fn capture_scale(&self) -> f32 {
        self.capture_scale
    }

    /// Staging base width.
    pub fn staging_width_px(&self) -> u32 {
        self.staging_width_px
    }

    /// Maximum chart height.
    pub fn chart_max_height_mm(&self) -> f64 {
        self.chart_max_height_mm
    }

    /// Maximum logo height.
    pub fn logo_max_height_mm(&self) -> f64 {
        self.logo_max_height_mm
    }

    /// Left-hand logo path.
    pub fn primary_logo(&self) -> Option<&Path> {
        self.primary_logo.as_deref()
    }

    /// Right-hand logo path.
    pub fn secondary_logo(&self) -> Option<&Path> {
        self.secondary_logo.as_deref()
    }

    /// Placeholder text.
    pub fn placeholder_text(&self) -> &str {
        &self.placeholder_text
    }

    /// Label for an unbounded date range.
    pub fn all_periods_label(&self) -> &str {
        &self.all_periods_label
    }

    /// Summary heading.
    pub fn summary_title(&self) -> &str {
        &self.summary_title
    }

    /// Artifact file extension.
    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    /// The date used in the artifact name; today's local date unless pinned.
    pub fn generation_date(&self) -> NaiveDate {
        self.generation_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = ReportOptions::default();
        assert_eq!(options.pagination(), &PaginationPolicy::merging());
        assert_eq!(options.capture_scale(), 2.0);
        assert_eq!(options.chart_max_height_mm(), 100.0);
        assert_eq!(options.file_extension(), "pdf");
        assert_eq!(
            options.primary_logo(),
            Some(Path::new("assets/branding/primary.png"))
        );
    }

    #[test]
    fn pinned_date_is_used() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let options = ReportOptions::new().with_generation_date(date);
        assert_eq!(options.generation_date(), date);
    }

    #[test]
    fn branding_can_be_disabled() {
        let options = ReportOptions::new().without_branding();
        assert!(options.primary_logo().is_none());
        assert!(options.secondary_logo().is_none());
    }
}
