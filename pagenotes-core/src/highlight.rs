//! Highlight Store: per-page rectangular text-selection annotations,
//! persisted as a JSON blob embedded in the notes document.
//!
//! Coordinates are page-space (unscaled by zoom); multiplying by the current
//! render scale is the rendering layer's concern. The embedded block keeps
//! the notes document as the single source of truth: it sits at the very end
//! of the document between two sentinel lines and is stripped back out before
//! any section operation sees the text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::document::normalize_end;
use crate::error::NotesError;

/// Sentinel line opening the embedded highlights block.
pub const HIGHLIGHTS_BEGIN: &str = "<!-- HIGHLIGHTS_DATA";

/// Sentinel line closing the embedded highlights block.
pub const HIGHLIGHTS_END: &str = "END_HIGHLIGHTS -->";

/// Fill color recorded on highlights created without an explicit color.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "rgba(255, 212, 0, 0.35)";

/// Page-space selection rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub id: String,
    pub page: u32,
    #[serde(flatten)]
    pub rect: HighlightRect,
    pub color: String,
    /// Snippet of the selected text, when the renderer could provide one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Mapping from page number to that page's highlights in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightMap {
    pages: BTreeMap<u32, Vec<HighlightRecord>>,
}

impl HighlightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a highlight to `page`'s list and returns the stored record.
    pub fn add(
        &mut self,
        page: u32,
        rect: HighlightRect,
        color: impl Into<String>,
        text: Option<String>,
    ) -> Result<HighlightRecord, NotesError> {
        if page == 0 {
            return Err(NotesError::InvalidPageNumber(page));
        }
        let record = HighlightRecord {
            id: Uuid::new_v4().to_string(),
            page,
            rect,
            color: color.into(),
            text,
        };
        self.pages.entry(page).or_default().push(record.clone());
        Ok(record)
    }

    /// Removes the highlight with the given id. A page whose list becomes
    /// empty is dropped from the mapping entirely.
    pub fn remove(&mut self, id: &str) -> bool {
        let mut emptied = None;
        let mut removed = false;
        for (&page, records) in self.pages.iter_mut() {
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() != before {
                removed = true;
                if records.is_empty() {
                    emptied = Some(page);
                }
                break;
            }
        }
        if let Some(page) = emptied {
            self.pages.remove(&page);
        }
        removed
    }

    /// Pages carrying at least one highlight, in ascending order.
    pub fn pages(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    pub fn records_for(&self, page: u32) -> &[HighlightRecord] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn to_blob(&self) -> Result<String, NotesError> {
        serde_json::to_string(self).map_err(|err| NotesError::MalformedBlob(err.to_string()))
    }

    /// Decodes a persisted blob. An absent, empty, or malformed blob yields
    /// the empty mapping: a document with no prior highlights is the common
    /// case, not a failure.
    pub fn from_blob(blob: Option<&str>) -> Self {
        let Some(raw) = blob else {
            return Self::default();
        };
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(map) => map,
            Err(err) => {
                warn!(%err, "discarding malformed highlight blob");
                Self::default()
            }
        }
    }
}

/// Splits a composed notes document into the notes text (block removed) and
/// the raw blob between the sentinels, if a block was present.
pub fn split_highlights(document: &str) -> (String, Option<String>) {
    let mut notes: Vec<&str> = Vec::new();
    let mut blob: Vec<&str> = Vec::new();
    let mut in_block = false;
    let mut seen_block = false;

    for line in document.split('\n') {
        if !seen_block && line == HIGHLIGHTS_BEGIN {
            seen_block = true;
            in_block = true;
            continue;
        }
        if in_block {
            if line == HIGHLIGHTS_END {
                in_block = false;
            } else {
                blob.push(line);
            }
            continue;
        }
        notes.push(line);
    }

    let notes = normalize_end(notes.join("\n"));
    let blob = seen_block.then(|| blob.join("\n"));
    (notes, blob)
}

/// Re-embeds the highlight mapping at the end of the notes document. An
/// empty mapping produces no block at all.
pub fn embed_highlights(document: &str, map: &HighlightMap) -> Result<String, NotesError> {
    let (notes, _) = split_highlights(document);
    if map.is_empty() {
        return Ok(notes);
    }
    let blob = map.to_blob()?;
    let mut out = notes;
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(HIGHLIGHTS_BEGIN);
    out.push('\n');
    out.push_str(&blob);
    out.push('\n');
    out.push_str(HIGHLIGHTS_END);
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{extract_section, list_pages, upsert_section};

    fn rect(x: f32, y: f32) -> HighlightRect {
        HighlightRect {
            x,
            y,
            width: 120.0,
            height: 16.0,
        }
    }

    #[test]
    fn add_assigns_fresh_ids_and_preserves_order() {
        let mut map = HighlightMap::new();
        let a = map
            .add(1, rect(10.0, 20.0), DEFAULT_HIGHLIGHT_COLOR, None)
            .unwrap();
        let b = map
            .add(1, rect(30.0, 40.0), DEFAULT_HIGHLIGHT_COLOR, Some("snippet".into()))
            .unwrap();
        assert_ne!(a.id, b.id);

        let records = map.records_for(1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, a.id);
        assert_eq!(records[1].id, b.id);
    }

    #[test]
    fn add_rejects_page_zero() {
        let mut map = HighlightMap::new();
        assert!(matches!(
            map.add(0, rect(0.0, 0.0), "red", None),
            Err(NotesError::InvalidPageNumber(0))
        ));
    }

    #[test]
    fn blob_round_trips_including_empty_map() {
        let empty = HighlightMap::new();
        let restored = HighlightMap::from_blob(Some(&empty.to_blob().unwrap()));
        assert_eq!(restored, empty);

        let mut map = HighlightMap::new();
        map.add(1, rect(1.0, 2.0), "yellow", Some("alpha".into()))
            .unwrap();
        map.add(1, rect(3.0, 4.0), "green", None).unwrap();
        map.add(5, rect(5.0, 6.0), "yellow", Some("beta".into()))
            .unwrap();
        let restored = HighlightMap::from_blob(Some(&map.to_blob().unwrap()));
        assert_eq!(restored, map);
    }

    #[test]
    fn malformed_or_absent_blob_yields_empty_map() {
        assert!(HighlightMap::from_blob(None).is_empty());
        assert!(HighlightMap::from_blob(Some("")).is_empty());
        assert!(HighlightMap::from_blob(Some("not json {")).is_empty());
        assert!(HighlightMap::from_blob(Some("[1, 2, 3]")).is_empty());
    }

    #[test]
    fn removing_last_record_drops_the_page() {
        let mut map = HighlightMap::new();
        let only = map.add(2, rect(0.0, 0.0), "yellow", None).unwrap();
        let kept = map.add(3, rect(0.0, 0.0), "yellow", None).unwrap();

        assert!(map.remove(&only.id));
        assert_eq!(map.pages(), vec![3]);
        assert!(map.records_for(2).is_empty());
        assert!(!map.remove(&only.id));
        assert!(map.remove(&kept.id));
        assert!(map.is_empty());
    }

    #[test]
    fn embed_and_split_round_trip() {
        let doc = upsert_section("", 1, "body").unwrap();
        let mut map = HighlightMap::new();
        map.add(1, rect(9.0, 9.0), "yellow", None).unwrap();

        let composed = embed_highlights(&doc, &map).unwrap();
        assert!(composed.contains(HIGHLIGHTS_BEGIN));
        assert!(composed.ends_with(&format!("{HIGHLIGHTS_END}\n")));

        let (notes, blob) = split_highlights(&composed);
        assert_eq!(notes, doc);
        assert_eq!(HighlightMap::from_blob(blob.as_deref()), map);
    }

    #[test]
    fn empty_map_embeds_no_block() {
        let doc = upsert_section("", 1, "body").unwrap();
        let composed = embed_highlights(&doc, &HighlightMap::new()).unwrap();
        assert_eq!(composed, doc);

        // Also strips a stale block left behind by a previous save.
        let mut map = HighlightMap::new();
        map.add(1, rect(0.0, 0.0), "yellow", None).unwrap();
        let with_block = embed_highlights(&doc, &map).unwrap();
        let stripped = embed_highlights(&with_block, &HighlightMap::new()).unwrap();
        assert_eq!(stripped, doc);
    }

    #[test]
    fn embedded_block_does_not_disturb_sections() {
        let doc = upsert_section(SAMPLE_DOC, 2, "World").unwrap();
        let mut map = HighlightMap::new();
        map.add(1, rect(0.0, 0.0), "yellow", None).unwrap();
        let composed = embed_highlights(&doc, &map).unwrap();

        assert_eq!(list_pages(&composed), vec![1, 2]);
        assert_eq!(
            extract_section(&composed, 2).unwrap(),
            Some("World".to_owned())
        );

        // Appending a section lands before the block.
        let appended = upsert_section(&composed, 3, "third").unwrap();
        assert_eq!(
            extract_section(&appended, 3).unwrap(),
            Some("third".to_owned())
        );
        let (_, blob) = split_highlights(&appended);
        assert_eq!(HighlightMap::from_blob(blob.as_deref()), map);
    }

    const SAMPLE_DOC: &str = "# Notes\n\n## Page 1\n\nHello\n\n## Page 2\n\nWorld\n";
}
