//! Content classifier (spec.md §4.11).

use crate::filter::normalize_content_type;

/// Coarse content category, used to decide whether the JS post-processing
/// pipeline applies and to populate `statistics.by_content_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    JavaScript,
    Json,
    Html,
    Css,
    Xml,
    Text,
    Image,
    Video,
    Audio,
    Pdf,
    Archive,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::JavaScript => "javascript",
            Category::Json => "json",
            Category::Html => "html",
            Category::Css => "css",
            Category::Xml => "xml",
            Category::Text => "text",
            Category::Image => "image",
            Category::Video => "video",
            Category::Audio => "audio",
            Category::Pdf => "pdf",
            Category::Archive => "archive",
            Category::Other => "other",
        }
    }
}

/// Classify a content type (after stripping parameters) by prefix match.
pub fn classify(content_type: &str) -> Category {
    let ct = normalize_content_type(content_type);

    if ct.contains("javascript") || ct == "application/ecmascript" || ct == "text/ecmascript" {
        Category::JavaScript
    } else if ct.contains("json") {
        Category::Json
    } else if ct.contains("html") {
        Category::Html
    } else if ct.contains("css") {
        Category::Css
    } else if ct.contains("xml") {
        Category::Xml
    } else if ct.starts_with("text/") {
        Category::Text
    } else if ct.starts_with("image/") {
        Category::Image
    } else if ct.starts_with("video/") {
        Category::Video
    } else if ct.starts_with("audio/") {
        Category::Audio
    } else if ct == "application/pdf" {
        Category::Pdf
    } else if ct.contains("zip") || ct.contains("tar") || ct.contains("gzip") || ct.contains("compress") || ct.contains("rar") || ct.contains("7z") {
        Category::Archive
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_types() {
        assert_eq!(classify("application/javascript; charset=utf-8"), Category::JavaScript);
        assert_eq!(classify("application/json"), Category::Json);
        assert_eq!(classify("text/html"), Category::Html);
        assert_eq!(classify("text/css"), Category::Css);
        assert_eq!(classify("application/xml"), Category::Xml);
        assert_eq!(classify("text/plain"), Category::Text);
        assert_eq!(classify("image/png"), Category::Image);
        assert_eq!(classify("video/mp4"), Category::Video);
        assert_eq!(classify("audio/mpeg"), Category::Audio);
        assert_eq!(classify("application/pdf"), Category::Pdf);
        assert_eq!(classify("application/zip"), Category::Archive);
        assert_eq!(classify("application/octet-stream"), Category::Other);
    }
}
