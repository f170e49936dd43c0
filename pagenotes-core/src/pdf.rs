//! PDF source contract. Rendering itself lives in the hosting application;
//! any concrete renderer library is an adapter behind these traits.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("corrupt document: {0}")]
    CorruptDocument(String),

    #[error("unsupported document format")]
    UnsupportedFormat,

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },
}

/// Page dimensions at a given render scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Surface a page renders into. The target receives RGBA pixels already
/// multiplied by the requested scale.
pub trait RenderTarget {
    fn present(&mut self, width: u32, height: u32, pixels: &[u8]);
}

pub trait PdfPage {
    fn size(&self, scale: f32) -> PageSize;
    fn render(&self, target: &mut dyn RenderTarget, scale: f32) -> Result<(), PdfError>;
}

pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Returns the 1-based page, or `PageOutOfRange`.
    fn page(&self, page: u32) -> Result<Box<dyn PdfPage + '_>, PdfError>;
}

#[async_trait]
pub trait PdfSource: Send + Sync {
    /// Parses raw PDF bytes. Errors: `CorruptDocument`, `UnsupportedFormat`.
    async fn open(&self, bytes: &[u8]) -> Result<Arc<dyn PdfDocument>, PdfError>;
}
