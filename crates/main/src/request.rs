//! JSON request files.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::warn;
use serde::Deserialize;

use report_composer::capture::ChartHandle;
use report_composer::error::CaptureError;
use report_composer::model::{DateRange, RowFilter, SummaryEntry};
use report_composer::{ReportRequest, SectionSpec, TableDataset};

/// Top-level shape of a request file.
#[derive(Debug, Deserialize)]
pub struct RequestFile {
    title: String,
    #[serde(default)]
    date_range: DateRange,
    #[serde(default)]
    summary: Vec<SummaryEntry>,
    sections: Option<Vec<SectionFile>>,
}

#[derive(Debug, Deserialize)]
struct SectionFile {
    title: String,
    #[serde(default)]
    chart_image: Option<PathBuf>,
    /// View the chart is switched to before capture.
    #[serde(default)]
    chart_view: Option<String>,
    #[serde(default)]
    dataset: Option<TableDataset>,
    #[serde(default)]
    row_filter: RowFilter,
    #[serde(default)]
    optional: bool,
}

impl RequestFile {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
        let request = serde_json::from_str(&text)
            .map_err(|err| format!("failed to parse {}: {}", path.display(), err))?;
        Ok(request)
    }

    /// Converts the file into an engine request. Chart images are resolved relative to `base`.
    pub fn into_request(self, base: &Path) -> ReportRequest {
        let sections = self.sections.map(|sections| {
            sections
                .into_iter()
                .map(|section| {
                    let chart = section.chart_image.map(|path| {
                        Box::new(ImageChart::new(base.join(path))) as Box<dyn ChartHandle>
                    });
                    SectionSpec::new(section.title)
                        .with_boxed_chart(chart)
                        .with_chart_view(section.chart_view)
                        .with_dataset(section.dataset)
                        .with_row_filter(section.row_filter)
                        .with_optional(section.optional)
                })
                .collect()
        });

        ReportRequest::new(self.title)
            .with_date_range(self.date_range)
            .with_summary(self.summary)
            .with_sections(sections)
    }
}

/// A chart exported ahead of time as an image file.
struct ImageChart {
    name: String,
    path: PathBuf,
}

impl ImageChart {
    fn new(path: PathBuf) -> Self {
        Self {
            name: path.display().to_string(),
            path,
        }
    }
}

impl ChartHandle for ImageChart {
    fn name(&self) -> &str {
        &self.name
    }

    fn surface(&self) -> Result<Option<RgbaImage>, CaptureError> {
        match image::open(&self.path) {
            Ok(decoded) => Ok(Some(decoded.to_rgba8())),
            Err(err) => {
                warn!("Chart image {} unreadable", self.path.display());
                Err(CaptureError::Surface(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sections_survive_parsing() {
        let file: RequestFile =
            serde_json::from_str(r#"{ "title": "Approvals", "sections": null }"#).unwrap();
        let request = file.into_request(Path::new("."));
        assert!(request.sections().is_none());
    }

    #[test]
    fn sections_carry_datasets_and_filters() {
        let file: RequestFile = serde_json::from_str(
            r#"{
                "title": "Approvals",
                "date_range": { "start": "2024-01-01", "end": null },
                "summary": [{ "label": "Total", "value": 4 }],
                "sections": [{
                    "title": "By department",
                    "dataset": { "headers": ["Dept", "Count"], "rows": [["Ops", 0]] },
                    "row_filter": "drop_zero_rows"
                }]
            }"#,
        )
        .unwrap();
        let request = file.into_request(Path::new("."));
        let sections = request.sections().unwrap();
        assert_eq!(sections[0].row_filter(), RowFilter::DropZeroRows);
        assert!(sections[0].chart().is_none());
        assert!(sections[0].chart_view().is_none());
        assert_eq!(request.summary().len(), 1);
    }

    #[test]
    fn chart_images_resolve_against_base_with_view() {
        let file: RequestFile = serde_json::from_str(
            r#"{
                "title": "Approvals",
                "sections": [{
                    "title": "Pending",
                    "chart_image": "charts/pending.png",
                    "chart_view": "pending"
                }]
            }"#,
        )
        .unwrap();
        let request = file.into_request(Path::new("requests"));
        let section = &request.sections().unwrap()[0];
        assert_eq!(section.chart_view(), Some("pending"));
        assert_eq!(
            section.chart().unwrap().name(),
            Path::new("requests").join("charts/pending.png").display().to_string()
        );
    }
}
