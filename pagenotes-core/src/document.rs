//! Page-Note Mapper: maps 1-based page numbers onto sections of a single
//! markdown notes document.
//!
//! A section starts at a page marker line and runs to the next marker, the
//! embedded highlights block, or end of document. The marker grammar is
//! deliberately strict: a line counts as a marker only when it is exactly
//! [`PAGE_MARKER_PREFIX`] followed by an integer and end-of-line, so
//! lookalike lines with trailing text stay inside section bodies.

use std::path::{Path, PathBuf};

use crate::error::NotesError;
use crate::highlight::HIGHLIGHTS_BEGIN;

/// Literal prefix of a page marker line.
pub const PAGE_MARKER_PREFIX: &str = "## Page ";

/// Suffix appended to a PDF's file stem to derive its notes document path.
pub const NOTES_SUFFIX: &str = "-notes.md";

/// Parses a line as a page marker. Trailing text disqualifies the line, as
/// does a page number of zero.
fn marker_page(line: &str) -> Option<u32> {
    let digits = line.strip_prefix(PAGE_MARKER_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&page| page >= 1)
}

fn marker_line(page: u32) -> String {
    format!("{PAGE_MARKER_PREFIX}{page}")
}

fn ensure_valid_page(page: u32) -> Result<(), NotesError> {
    if page == 0 {
        return Err(NotesError::InvalidPageNumber(page));
    }
    Ok(())
}

/// Derives the notes document path for a PDF: `<pdf-basename>-notes.md`
/// beside the source file.
pub fn notes_path_for(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_owned());
    pdf_path.with_file_name(format!("{stem}{NOTES_SUFFIX}"))
}

/// Preamble written into a freshly created notes document.
pub fn initial_notes_document(pdf_path: &Path) -> String {
    let name = pdf_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_owned());
    format!("# Notes for {name}\n")
}

/// Returns the body of `page`'s section, trimmed of leading and trailing
/// blank lines. `Ok(None)` when the page was never annotated; an annotated
/// page with no content yields `Ok(Some(String::new()))`.
pub fn extract_section(document: &str, page: u32) -> Result<Option<String>, NotesError> {
    ensure_valid_page(page)?;

    let mut collecting = false;
    let mut body: Vec<&str> = Vec::new();
    for line in document.split('\n') {
        if collecting {
            if marker_page(line).is_some() || line == HIGHLIGHTS_BEGIN {
                break;
            }
            body.push(line);
        } else if marker_page(line) == Some(page) {
            // First occurrence is canonical; later duplicates are ignored.
            collecting = true;
        }
    }
    if !collecting {
        return Ok(None);
    }

    while body.first().is_some_and(|l| l.trim().is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }
    Ok(Some(body.join("\n")))
}

/// Replaces `page`'s section body in place, or appends a new section at the
/// end of the document (before the highlights block, after one blank line).
///
/// Idempotent for a fixed body: the replacement body is stored in canonical
/// form (edge blank lines trimmed, one blank line on each side), so applying
/// the same upsert twice yields the same document. Every other section is
/// preserved verbatim.
pub fn upsert_section(document: &str, page: u32, body: &str) -> Result<String, NotesError> {
    ensure_valid_page(page)?;

    let mut parsed = ParsedNotes::parse(document);
    let canonical = canonical_body_lines(body);

    match parsed.sections.iter().position(|s| s.page == page) {
        Some(index) => {
            parsed.sections[index].lines = canonical;
            // Collapse duplicate sections for this page into the canonical one.
            let mut kept = false;
            parsed.sections.retain(|s| {
                if s.page != page {
                    return true;
                }
                !std::mem::replace(&mut kept, true)
            });
        }
        None => {
            match parsed.sections.last_mut() {
                Some(last) => {
                    trim_trailing_blank(&mut last.lines);
                    last.lines.push(String::new());
                }
                None => {
                    trim_trailing_blank(&mut parsed.preamble);
                    if !parsed.preamble.is_empty() {
                        parsed.preamble.push(String::new());
                    }
                }
            }
            parsed.sections.push(Section {
                page,
                lines: canonical,
            });
        }
    }

    Ok(parsed.render())
}

/// Every marker's page number in document order. Duplicate markers (corrupt
/// document) are reported once, for their first occurrence.
pub fn list_pages(document: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    for line in document.split('\n') {
        if line == HIGHLIGHTS_BEGIN {
            break;
        }
        if let Some(page) = marker_page(line) {
            if !pages.contains(&page) {
                pages.push(page);
            }
        }
    }
    pages
}

/// Trims trailing newlines down to exactly one (none for an empty document).
pub(crate) fn normalize_end(text: String) -> String {
    let trimmed = text.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

struct Section {
    page: u32,
    lines: Vec<String>,
}

/// Line-level view of a notes document: free-form preamble, page sections,
/// and the verbatim highlights trailer (kept at the very end so appended
/// sections land before it).
struct ParsedNotes {
    preamble: Vec<String>,
    sections: Vec<Section>,
    trailer: Vec<String>,
}

impl ParsedNotes {
    fn parse(document: &str) -> Self {
        let mut preamble = Vec::new();
        let mut sections: Vec<Section> = Vec::new();
        let mut trailer = Vec::new();
        let mut in_trailer = false;

        for line in document.split('\n') {
            if in_trailer {
                trailer.push(line.to_owned());
                continue;
            }
            if line == HIGHLIGHTS_BEGIN {
                in_trailer = true;
                trailer.push(line.to_owned());
                continue;
            }
            if let Some(page) = marker_page(line) {
                sections.push(Section {
                    page,
                    lines: Vec::new(),
                });
                continue;
            }
            match sections.last_mut() {
                Some(section) => section.lines.push(line.to_owned()),
                None => preamble.push(line.to_owned()),
            }
        }

        Self {
            preamble,
            sections,
            trailer,
        }
    }

    fn render(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        lines.extend(self.preamble.iter().map(String::as_str));
        let markers: Vec<String> = self.sections.iter().map(|s| marker_line(s.page)).collect();
        for (section, marker) in self.sections.iter().zip(&markers) {
            lines.push(marker.as_str());
            lines.extend(section.lines.iter().map(String::as_str));
        }
        lines.extend(self.trailer.iter().map(String::as_str));
        normalize_end(lines.join("\n"))
    }
}

/// Canonical stored form of a section body: one blank line on each side,
/// edge blank lines of the body itself trimmed. An empty body collapses to a
/// single blank separator line.
fn canonical_body_lines(body: &str) -> Vec<String> {
    let mut inner: Vec<&str> = body.split('\n').collect();
    while inner.first().is_some_and(|l| l.trim().is_empty()) {
        inner.remove(0);
    }
    while inner.last().is_some_and(|l| l.trim().is_empty()) {
        inner.pop();
    }
    if inner.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::with_capacity(inner.len() + 2);
    lines.push(String::new());
    lines.extend(inner.into_iter().map(str::to_owned));
    lines.push(String::new());
    lines
}

fn trim_trailing_blank(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}
