use url::Url;

/// Extensions skipped without fetching: binary, media, and document formats
/// that never contain crawlable HTML.
const DEFAULT_SKIPPED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "bmp", "tiff", "svg", "webp", "mp4", "avi", "mkv", "mov",
    "wmv", "flv", "mp3", "wav", "aac", "flac", "ogg", "zip", "rar", "7z", "tar", "gz", "exe",
    "dmg", "iso", "apk", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf",
];

/// Filter that decides whether a URL points at a non-HTML file
///
/// The extension list is configurable; the default covers common binary and
/// media formats. Matching is case-insensitive on the last path segment's
/// extension and ignores the query string.
#[derive(Debug, Clone)]
pub struct FileTypeFilter {
    extensions: Vec<String>,
}

impl FileTypeFilter {
    /// Creates a filter with a custom extension list (leading dots allowed)
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the URL's path ends with a skipped extension
    pub fn is_file_url(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };

        // A dot inside an earlier segment is not an extension
        if ext.contains('/') {
            return false;
        }

        self.extensions.iter().any(|e| e == ext)
    }
}

impl Default for FileTypeFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_SKIPPED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}
