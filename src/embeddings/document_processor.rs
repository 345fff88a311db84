//! Document loading
//!
//! Turns the policy document into page-sized text chunks. PDFs are read with
//! `lopdf`; plain-text documents are split on form feeds.

use std::path::Path;

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::types::{AppError, AppResult};

const FORM_FEED: char = '\u{0c}';

pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Load a document as one text chunk per page, in page order
    pub fn load_pages(path: &Path) -> AppResult<Vec<String>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let pages = match extension.as_str() {
            "pdf" => Self::load_pdf(path)?,
            "txt" | "md" => Self::load_text(path)?,
            other => {
                return Err(AppError::Document(format!(
                    "Unsupported document type {:?} for {}",
                    other,
                    path.display()
                )));
            }
        };

        if pages.is_empty() {
            return Err(AppError::Document(format!(
                "{} contains no pages",
                path.display()
            )));
        }

        info!(path = %path.display(), pages = pages.len(), "Loaded document");
        Ok(pages)
    }

    fn load_pdf(path: &Path) -> AppResult<Vec<String>> {
        let document = Document::load(path).map_err(|e| {
            AppError::Document(format!("Failed to open PDF {}: {}", path.display(), e))
        })?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());

        for page_number in page_numbers {
            match document.extract_text(&[page_number]) {
                Ok(text) => {
                    debug!(page = page_number, chars = text.len(), "Extracted page text");
                    pages.push(text);
                }
                Err(e) => {
                    // Keep the slot so chunk indices still line up with pages
                    warn!(page = page_number, error = %e, "Could not extract page text");
                    pages.push(String::new());
                }
            }
        }

        Ok(pages)
    }

    fn load_text(path: &Path) -> AppResult<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::split_pages(&content))
    }

    /// Split plain text into pages on form feeds
    pub fn split_pages(content: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }
        content.split(FORM_FEED).map(str::to_string).collect()
    }
}
