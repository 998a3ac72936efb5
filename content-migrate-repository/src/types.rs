//! Request and response types for content store operations.

use content_migrate_shared::RecordId;
use serde_json::Value;

/// Query options for listing a collection.
///
/// Maps onto the store's query string: `populate=*` expands relations and media into
/// embedded objects, `pagination[page]` / `pagination[pageSize]` select a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Expand relations into embedded objects.
    pub populate: bool,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Number of items per page.
    pub page_size: Option<u32>,
}

impl ListQuery {
    /// Query used by the exporter: every relation expanded.
    pub fn populated() -> Self {
        Self {
            populate: true,
            ..Self::default()
        }
    }

    /// Query used by the reset step: one bounded page, no expansion.
    pub fn bounded(page_size: u32) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    /// Same query, addressed to `page`.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Query string pairs in the store's bracket notation.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if self.populate {
            pairs.push(("populate".to_string(), "*".to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("pagination[page]".to_string(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pagination[pageSize]".to_string(), page_size.to_string()));
        }
        pairs
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    /// Items exactly as the store returned them.
    pub items: Vec<Value>,
    /// 1-based page number of this page.
    pub page: u32,
    /// Total number of pages the store reports (at least 1).
    pub page_count: u32,
}

impl RecordPage {
    /// Whether a later page exists.
    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// A media blob to upload.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// File name sent with the multipart part.
    pub file_name: String,
    /// MIME type, if known.
    pub mime: Option<String>,
    /// Raw blob bytes.
    pub bytes: Vec<u8>,
}

/// The media asset the store created for an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    /// Target-side file identifier.
    pub id: RecordId,
    /// Content hash the target assigned, if reported.
    pub content_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populated_query_pairs() {
        assert_eq!(
            ListQuery::populated().with_page(2).to_query_pairs(),
            vec![
                ("populate".to_string(), "*".to_string()),
                ("pagination[page]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_bounded_query_pairs() {
        assert_eq!(
            ListQuery::bounded(1000).to_query_pairs(),
            vec![("pagination[pageSize]".to_string(), "1000".to_string())]
        );
    }

    #[test]
    fn test_has_next() {
        let page = RecordPage {
            items: vec![],
            page: 1,
            page_count: 3,
        };
        assert!(page.has_next());
        assert!(!RecordPage { page: 3, ..page }.has_next());
    }
}
