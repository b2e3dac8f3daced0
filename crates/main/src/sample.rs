//! A built-in demonstration report.

use std::sync::Arc;

use chrono::NaiveDate;
use image::{Rgba, RgbaImage};

use report_composer::capture::ChartHandle;
use report_composer::error::CaptureError;
use report_composer::model::{CellValue, DateRange, RowFilter, SummaryEntry};
use report_composer::visual::{StageElement, VisualSpec};
use report_composer::{ReportRequest, SectionSpec, TableDataset};

const BAR_COLOR: [u8; 3] = [52, 120, 196];
const AXIS_COLOR: [u8; 3] = [90, 90, 90];

/// A bar chart that only exposes its container, so it is captured through the staging area.
#[derive(Clone)]
struct BarChart {
    name: String,
    values: Vec<f64>,
}

impl StageElement for BarChart {
    fn height_px(&self, width_px: u32) -> u32 {
        width_px * 9 / 16
    }

    fn paint(&self, canvas: &mut RgbaImage, _scale: f32) -> Result<(), CaptureError> {
        let (width, height) = canvas.dimensions();
        if self.values.is_empty() || width < 20 || height < 20 {
            return Err(CaptureError::Capture(format!(
                "chart '{}' has nothing to draw",
                self.name
            )));
        }
        let max = self.values.iter().cloned().fold(f64::MIN, f64::max).max(1.0);
        let margin = width / 20;
        let baseline = height - margin;
        let slot = (width - 2 * margin) / self.values.len() as u32;

        for x in margin..width - margin {
            canvas.put_pixel(x, baseline, rgba(AXIS_COLOR));
        }
        for (index, value) in self.values.iter().enumerate() {
            let bar_height = ((value / max) * f64::from(baseline - margin)) as u32;
            let left = margin + slot * index as u32 + slot / 6;
            let right = left + slot * 2 / 3;
            for x in left..right.min(width) {
                for y in baseline.saturating_sub(bar_height)..baseline {
                    canvas.put_pixel(x, y, rgba(BAR_COLOR));
                }
            }
        }
        Ok(())
    }
}

impl ChartHandle for BarChart {
    fn name(&self) -> &str {
        &self.name
    }

    fn container(&self) -> Option<VisualSpec> {
        Some(VisualSpec::Element(Arc::new(self.clone())))
    }
}

fn rgba([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

fn department_rows() -> Vec<Vec<CellValue>> {
    [
        "Finance",
        "Operations",
        "Sales",
        "Marketing",
        "Engineering",
        "Support",
        "Legal",
        "Procurement",
        "Facilities",
        "Research",
        "Security",
        "Training",
        "Logistics",
    ]
    .iter()
    .enumerate()
    .map(|(index, name)| {
        let approved = (index as i64 * 7) % 11;
        let pending = (index as i64 * 3) % 5;
        vec![
            CellValue::from(*name),
            CellValue::from(approved),
            CellValue::from(pending),
        ]
    })
    .collect()
}

/// Builds the sample request: a summary, a staged chart with a table and an empty section.
pub fn request() -> ReportRequest {
    let rows = department_rows();
    let approved: Vec<f64> = rows
        .iter()
        .map(|row| match row[1] {
            CellValue::Number(value) => value,
            _ => 0.0,
        })
        .collect();
    let total: f64 = approved.iter().sum();

    let departments = TableDataset::new(
        vec!["Department".into(), "Approved".into(), "Pending".into()],
        rows,
    );

    let mut request = ReportRequest::new("Request Approvals")
        .with_summary(vec![
            SummaryEntry::new("Departments", approved.len() as i64),
            SummaryEntry::new("Approved requests", total),
        ]);
    if let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(2024, 1, 1),
        NaiveDate::from_ymd_opt(2024, 3, 31),
    ) {
        request = request.with_date_range(DateRange::between(start, end));
    }

    request
        .with_section(
            SectionSpec::new("Approvals by department")
                .with_chart(BarChart {
                    name: "approvals".into(),
                    values: approved,
                })
                .with_dataset(departments.ok())
                .with_row_filter(RowFilter::DropZeroRows),
        )
        .with_section(SectionSpec::new("Escalations"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_has_two_sections() {
        let request = request();
        let sections = request.sections().unwrap();
        assert_eq!(sections.len(), 2);
        assert!(sections[0].chart().unwrap().container().is_some());
        assert_eq!(sections[0].dataset().unwrap().rows().len(), 13);
    }

    #[test]
    fn bar_chart_paints_bars() {
        let chart = BarChart {
            name: "test".into(),
            values: vec![1.0, 2.0],
        };
        let mut canvas = RgbaImage::new(200, chart.height_px(200));
        chart.paint(&mut canvas, 1.0).unwrap();
        assert!(canvas.pixels().any(|pixel| pixel.0 == [52, 120, 196, 255]));
    }
}
