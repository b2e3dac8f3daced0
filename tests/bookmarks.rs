#![cfg(feature = "bookmarks")]

use chrono::NaiveDate;
use image::RgbaImage;
use lopdf::{Document, Object, ObjectId};
use report_composer::error::CaptureError;
use report_composer::fonts;
use report_composer::model::CellValue;
use report_composer::output::MemorySink;
use report_composer::paginate::PaginationPolicy;
use report_composer::raster::{Rasterizer, StagingBackend};
use report_composer::visual::VisualSpec;
use report_composer::{ReportComposer, ReportOptions, ReportRequest, SectionSpec, TableDataset};

const SKIP_NOTE: &str =
    "bundled fonts missing. Set REPORT_COMPOSER_FONTS_DIR or copy assets/fonts next to the binary.";

/// Staging area that refuses everything, so all content is written natively.
struct RefusingStage;

impl StagingBackend for RefusingStage {
    fn mount(&mut self, _visual: &VisualSpec, _base_width_px: u32) -> Result<(), CaptureError> {
        Err(CaptureError::Mount("staging unavailable".into()))
    }

    fn capture(&mut self, _scale: f32) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::Capture("staging unavailable".into()))
    }

    fn unmount(&mut self) {}

    fn is_mounted(&self) -> bool {
        false
    }
}

fn request(rows: usize) -> ReportRequest {
    let rows = (0..rows)
        .map(|i| vec![CellValue::from(format!("Dept {}", i)), CellValue::from(i as i64 + 1)])
        .collect();
    ReportRequest::new("Quarterly Approvals")
        .with_section(
            SectionSpec::new("By department").with_dataset(
                TableDataset::new(vec!["Department".into(), "Approved".into()], rows)
                    .expect("valid dataset"),
            ),
        )
        .with_section(SectionSpec::new("Escalations"))
}

fn options() -> ReportOptions {
    ReportOptions::new()
        .without_branding()
        .with_generation_date(NaiveDate::from_ymd_opt(2024, 4, 2).expect("valid date"))
}

fn outline_targets(document: &Document) -> Vec<(String, ObjectId)> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .expect("catalog");
    let outlines_id = document
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Outlines"))
        .and_then(Object::as_reference)
        .expect("outlines");
    let mut next = document
        .get_dictionary(outlines_id)
        .and_then(|outlines| outlines.get(b"First"))
        .and_then(Object::as_reference)
        .ok();

    let mut targets = Vec::new();
    while let Some(id) = next {
        let entry = document.get_dictionary(id).expect("outline entry");
        let title = entry
            .get(b"Title")
            .and_then(Object::as_str)
            .expect("outline title");
        let dest = entry
            .get(b"Dest")
            .and_then(Object::as_array)
            .expect("outline destination");
        targets.push((
            String::from_utf8_lossy(title).into_owned(),
            dest[0].as_reference().expect("page reference"),
        ));
        next = entry.get(b"Next").and_then(Object::as_reference).ok();
    }
    targets
}

fn assert_outlines_match(composer: &mut ReportComposer, request: &ReportRequest) {
    let starts = composer
        .compose(request)
        .expect("compose")
        .document
        .section_starts()
        .to_vec();

    let mut sink = MemorySink::new();
    let report = composer.generate(request, &mut sink).expect("generate");
    let (_, bytes) = sink.saved().first().cloned().expect("artifact saved");
    let document = Document::load_mem(&bytes).expect("reload pdf");
    let pages = document.get_pages();

    assert_eq!(pages.len(), report.page_count);
    let targets = outline_targets(&document);
    assert_eq!(targets.len(), starts.len());
    for ((title, page_ref), start) in targets.iter().zip(&starts) {
        assert_eq!(title, &start.title);
        assert_eq!(*page_ref, pages[&(start.page_index as u32 + 1)]);
    }
}

#[test]
fn outlines_point_at_section_pages() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping outlines_point_at_section_pages: {}", SKIP_NOTE);
        return;
    }
    let mut composer = ReportComposer::with_bundled_fonts()
        .expect("bundled fonts load")
        .with_options(options());
    assert_outlines_match(&mut composer, &request(25));
}

#[test]
fn native_tables_keep_page_numbers_in_step() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping native_tables_keep_page_numbers_in_step: {}", SKIP_NOTE);
        return;
    }
    let mut composer = ReportComposer::new(Rasterizer::new(RefusingStage)).with_options(
        options().with_pagination(PaginationPolicy::merging().with_page_size(60)),
    );
    assert_outlines_match(&mut composer, &request(60));
}
