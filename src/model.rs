//! Data structures describing what a report should contain.
//!
//! The plain-data types in this module derive `serde` traits so that frontends can build them
//! from JSON. [`SectionSpec`] additionally carries a live [`ChartHandle`], which is why it and
//! [`ReportRequest`] are assembled in code rather than deserialized directly.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capture::ChartHandle;

/// A single table cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric content, printed without a trailing `.0` when integral.
    Number(f64),
    /// Free text.
    Text(String),
    /// An empty cell.
    Empty,
}

impl CellValue {
    /// Returns `true` when the cell holds the number zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, CellValue::Number(value) if *value == 0.0)
    }

    /// Returns `true` when the cell holds a number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            CellValue::Number(value) => write!(f, "{:.2}", value),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

/// One ordered row of cells.
pub type Row = Vec<CellValue>;

/// Tabular data with a fixed header row.
///
/// Every row has exactly as many cells as there are headers. [`TableDataset::new`] enforces
/// this; deserialized datasets are checked with [`TableDataset::validate`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDataset {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl TableDataset {
    /// Creates a dataset, rejecting rows whose width differs from the header row.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Result<Self, String> {
        let dataset = Self { headers, rows };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Checks that every row matches the header width.
    pub fn validate(&self) -> Result<(), String> {
        match self
            .rows
            .iter()
            .position(|row| row.len() != self.headers.len())
        {
            Some(index) => Err(format!(
                "row {} has {} cells but the table has {} headers",
                index,
                self.rows[index].len(),
                self.headers.len()
            )),
            None => Ok(()),
        }
    }

    /// Returns the header labels.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the data rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns `true` when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the rows that survive `filter`, preserving their order.
    pub fn filtered_rows(&self, filter: RowFilter) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| filter.keeps(row))
            .cloned()
            .collect()
    }
}

/// Domain filter applied to a section's rows before pagination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilter {
    /// Keep every row.
    #[default]
    Keep,
    /// Drop rows that have numeric cells and all of them are zero.
    DropZeroRows,
}

impl RowFilter {
    fn keeps(self, row: &[CellValue]) -> bool {
        match self {
            RowFilter::Keep => true,
            RowFilter::DropZeroRows => {
                let mut numeric = row.iter().filter(|cell| cell.is_numeric()).peekable();
                numeric.peek().is_none() || !numeric.all(CellValue::is_zero)
            }
        }
    }
}

/// The reporting period. Either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included in the report.
    pub start: Option<NaiveDate>,
    /// Last day included in the report.
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a closed range.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Renders the range for the title block, using `all_periods` when both bounds are open.
    pub fn describe(&self, all_periods: &str) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            (Some(start), None) => format!("From {}", start),
            (None, Some(end)) => format!("Until {}", end),
            (None, None) => all_periods.to_owned(),
        }
    }
}

/// A labelled aggregate statistic shown in the summary table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    /// Name of the statistic.
    pub label: String,
    /// Pre-formatted value.
    pub value: CellValue,
}

impl SummaryEntry {
    /// Creates a summary entry.
    pub fn new(label: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// One logical report unit: a chart and an optional detail table under a title.
pub struct SectionSpec {
    title: String,
    chart: Option<Box<dyn ChartHandle>>,
    chart_view: Option<String>,
    dataset: Option<TableDataset>,
    row_filter: RowFilter,
    optional: bool,
}

impl SectionSpec {
    /// Creates an empty section with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            chart: None,
            chart_view: None,
            dataset: None,
            row_filter: RowFilter::Keep,
            optional: false,
        }
    }

    /// Returns the section title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the live chart handle, if any.
    pub fn chart(&self) -> Option<&dyn ChartHandle> {
        self.chart.as_deref()
    }

    /// Returns the data view that must be selected on the chart before capture.
    pub fn chart_view(&self) -> Option<&str> {
        self.chart_view.as_deref()
    }

    /// Returns the detail dataset, if any.
    pub fn dataset(&self) -> Option<&TableDataset> {
        self.dataset.as_ref()
    }

    /// Returns the row filter applied before pagination.
    pub fn row_filter(&self) -> RowFilter {
        self.row_filter
    }

    /// Returns whether the section disappears instead of showing a placeholder.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Attaches a chart handle and returns the updated section.
    pub fn with_chart(mut self, chart: impl ChartHandle + 'static) -> Self {
        self.chart = Some(Box::new(chart));
        self
    }

    /// Attaches an already boxed chart handle and returns the updated section.
    pub fn with_boxed_chart(mut self, chart: Option<Box<dyn ChartHandle>>) -> Self {
        self.chart = chart;
        self
    }

    /// Selects the chart data view to render before capture.
    pub fn with_chart_view(mut self, view: impl Into<Option<String>>) -> Self {
        self.chart_view = view.into();
        self
    }

    /// Attaches the detail dataset and returns the updated section.
    pub fn with_dataset(mut self, dataset: impl Into<Option<TableDataset>>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Sets the row filter and returns the updated section.
    pub fn with_row_filter(mut self, filter: RowFilter) -> Self {
        self.row_filter = filter;
        self
    }

    /// Marks the section as optional and returns the updated section.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

impl fmt::Debug for SectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionSpec")
            .field("title", &self.title)
            .field("chart", &self.chart.as_ref().map(|chart| chart.name().to_owned()))
            .field("chart_view", &self.chart_view)
            .field("dataset", &self.dataset)
            .field("row_filter", &self.row_filter)
            .field("optional", &self.optional)
            .finish()
    }
}

/// Everything one generation run needs. Immutable for the duration of the run.
#[derive(Debug, Default)]
pub struct ReportRequest {
    title: String,
    date_range: DateRange,
    summary: Vec<SummaryEntry>,
    sections: Option<Vec<SectionSpec>>,
}

impl ReportRequest {
    /// Creates a request with the given title and an empty section list.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Returns the report title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the reporting period.
    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Returns the aggregate statistics.
    pub fn summary(&self) -> &[SummaryEntry] {
        &self.summary
    }

    /// Returns the sections, or `None` when the caller never provided a list.
    pub fn sections(&self) -> Option<&[SectionSpec]> {
        self.sections.as_deref()
    }

    /// Sets the reporting period and returns the updated request.
    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Appends an aggregate statistic and returns the updated request.
    pub fn with_summary_entry(mut self, entry: SummaryEntry) -> Self {
        self.summary.push(entry);
        self
    }

    /// Extends the aggregate statistics and returns the updated request.
    pub fn with_summary<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = SummaryEntry>,
    {
        self.summary.extend(entries);
        self
    }

    /// Appends a section and returns the updated request.
    pub fn with_section(mut self, section: SectionSpec) -> Self {
        self.sections.get_or_insert_with(Vec::new).push(section);
        self
    }

    /// Replaces the section list, `None` included, and returns the updated request.
    pub fn with_sections(mut self, sections: Option<Vec<SectionSpec>>) -> Self {
        self.sections = sections;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_rejects_ragged_rows() {
        let err = TableDataset::new(
            vec!["A".into(), "B".into()],
            vec![vec![1.0.into(), 2.0.into()], vec![3.0.into()]],
        )
        .unwrap_err();
        assert!(err.contains("row 1"));
    }

    #[test]
    fn zero_rows_are_dropped_only_when_every_number_is_zero() {
        let dataset = TableDataset::new(
            vec!["Dept".into(), "Open".into(), "Closed".into()],
            vec![
                vec!["Finance".into(), 0.0.into(), 0.0.into()],
                vec!["Legal".into(), 0.0.into(), 4.0.into()],
                vec!["Notes".into(), "n/a".into(), CellValue::Empty],
            ],
        )
        .unwrap();

        let rows = dataset.filtered_rows(RowFilter::DropZeroRows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], CellValue::from("Legal"));
        assert_eq!(rows[1][0], CellValue::from("Notes"));
        assert_eq!(dataset.filtered_rows(RowFilter::Keep).len(), 3);
    }

    #[test]
    fn cell_display_drops_integral_fraction() {
        assert_eq!(CellValue::Number(12.0).to_string(), "12");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.50");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn date_range_descriptions() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(
            DateRange::between(start, end).describe("All periods"),
            "2024-01-01 to 2024-03-31"
        );
        assert_eq!(
            DateRange {
                start: Some(start),
                end: None
            }
            .describe("All periods"),
            "From 2024-01-01"
        );
        assert_eq!(DateRange::default().describe("All periods"), "All periods");
    }

    #[test]
    fn cells_deserialize_untagged() {
        let cells: Vec<CellValue> = serde_json::from_str(r#"[3, "x", null]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::Number(3.0),
                CellValue::Text("x".into()),
                CellValue::Empty
            ]
        );
    }
}
