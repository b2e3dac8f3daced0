//! Font discovery shared by the PDF writer and the rasterizer.
//!
//! Both consumers read the same bundled Roboto files, so text drawn into captured bitmaps matches
//! the native text on the page. The directory is searched in this order:
//!
//! 1. `REPORT_COMPOSER_FONTS_DIR`
//! 2. `assets/fonts` next to the running executable
//! 3. `assets/fonts` under the crate manifest directory

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{self, FontData, FontFamily};

use crate::raster::GlyphFonts;

/// Environment variable overriding the font directory.
pub const FONTS_DIR_ENV: &str = "REPORT_COMPOSER_FONTS_DIR";

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

const REGULAR_FILE: &str = "Roboto-Regular.ttf";
const BOLD_FILE: &str = "Roboto-Bold.ttf";

const FONT_FILES: &[&str] = &[
    REGULAR_FILE,
    BOLD_FILE,
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

/// Directory holding the fonts that ship with the crate sources.
pub fn bundled_fonts_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env::var_os(FONTS_DIR_ENV) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }

    if let Some(bin_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(bin_dir.join("assets/fonts"));
    }

    let manifest_candidate = bundled_fonts_source_dir();
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_font_files(path: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

/// Finds the first candidate directory holding every font file.
pub fn resolve_font_directory() -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates() {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }
        let missing = missing_font_files(&candidate);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(Error::new(
        format!(
            "Unable to locate the font directory. Checked: {}. Set {} to a directory containing {}.",
            attempts.join(", "),
            FONTS_DIR_ENV,
            FONT_FILES.join(", ")
        ),
        io::Error::new(io::ErrorKind::NotFound, "fonts directory not found"),
    ))
}

/// Loads the Roboto family for the PDF writer.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = resolve_font_directory()?;

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                DEFAULT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

fn read_font_file(directory: &Path, name: &str) -> Result<Vec<u8>, Error> {
    let path = directory.join(name);
    fs::read(&path).map_err(|err| {
        Error::new(
            format!("Failed to read font file {}: {}", path.display(), err),
            err,
        )
    })
}

/// Loads the regular and bold faces for the rasterizer.
pub fn glyph_fonts() -> Result<GlyphFonts, Error> {
    let directory = resolve_font_directory()?;
    let regular = read_font_file(&directory, REGULAR_FILE)?;
    let bold = read_font_file(&directory, BOLD_FILE)?;

    GlyphFonts::from_bytes(regular, bold).ok_or_else(|| {
        Error::new(
            format!(
                "Font files in {} are not valid TrueType data",
                directory.display()
            ),
            io::Error::new(io::ErrorKind::InvalidData, "unparseable font data"),
        )
    })
}

/// Indicates whether every font file is present in one of the search locations.
pub fn default_fonts_available() -> bool {
    resolve_font_directory().is_ok()
}
