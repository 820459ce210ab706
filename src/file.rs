use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

static SPREADSHEET_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["xls", "xlsx", "xlsm", "xlsb", "ods", "csv"]
        .into_iter()
        .collect()
});

static PRESENTATION_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["ppt", "pptx", "pps", "ppsx", "odp"].into_iter().collect());

static IMAGE_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"]
        .into_iter()
        .collect()
});

static DOCUMENT_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["pdf", "doc", "docx", "odt", "rtf", "epub", "html", "htm"]
        .into_iter()
        .collect()
});

/// Broad family of a source document, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// Word processing documents and PDFs
    Document,
    /// Workbooks and tabular files
    Spreadsheet,
    /// Slide decks
    Presentation,
    /// Raster images (OCR input)
    Image,
    /// Anything else the configuration asked for
    Other,
}

impl DocumentKind {
    /// Classifies a file by its extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
        else {
            return Self::Other;
        };

        if DOCUMENT_EXTENSIONS.contains(ext.as_str()) {
            Self::Document
        } else if SPREADSHEET_EXTENSIONS.contains(ext.as_str()) {
            Self::Spreadsheet
        } else if PRESENTATION_EXTENSIONS.contains(ext.as_str()) {
            Self::Presentation
        } else if IMAGE_EXTENSIONS.contains(ext.as_str()) {
            Self::Image
        } else {
            Self::Other
        }
    }

    /// Returns a lowercase label for logs and summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Image => "image",
            Self::Other => "other",
        }
    }
}

/// A convertible file discovered under the source root.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Path to the file, prefixed by the source root
    pub path: PathBuf,

    /// Lowercase extension including the leading dot
    pub extension: String,

    /// Last modification time
    pub modified: SystemTime,
}

impl SourceEntry {
    /// Returns the document family of this entry.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_path(&self.path)
    }

    /// Returns the directory containing the file.
    #[must_use]
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// What the pipeline should do with a discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Output is missing or older than the source
    Convert,
    /// Output exists and is at least as new as the source
    SkipFresh,
}

/// A discovered file together with its mirrored output and decision.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    /// The source document
    pub source: SourceEntry,

    /// Where its Markdown lands in the output tree
    pub output: PathBuf,

    /// Convert or skip
    pub decision: Decision,
}

impl PlannedFile {
    /// Directory in the output tree that must exist before writing.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        self.output.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Returns the extension of `path` in the form used by configuration
/// (`.pdf`), lowercased. Files without an extension yield `None`.
#[must_use]
pub(crate) fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

/// Normalizes a configured extension: trims, lowercases, adds the dot.
#[must_use]
pub(crate) fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Re-roots `source` from `input_root` under `output_root`, appending
/// `.{suffix}` to the file name.
///
/// Returns `None` if `source` is not under `input_root` or has no file name.
#[must_use]
pub(crate) fn mirror_path(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    suffix: &str,
) -> Option<PathBuf> {
    let relative = source.strip_prefix(input_root).ok()?;
    let mut file_name = relative.file_name()?.to_os_string();
    file_name.push(".");
    file_name.push(suffix);

    let mut output = output_root.to_path_buf();
    if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
        output.push(parent);
    }
    output.push(file_name);
    Some(output)
}

/// An output is fresh when it exists and is not older than its source.
/// Equal timestamps count as fresh.
#[must_use]
pub(crate) fn is_fresh(source_modified: SystemTime, output_modified: Option<SystemTime>) -> bool {
    output_modified.is_some_and(|output| output >= source_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PDF")), DocumentKind::Document);
        assert_eq!(DocumentKind::from_path(Path::new("b.xlsm")), DocumentKind::Spreadsheet);
        assert_eq!(DocumentKind::from_path(Path::new("c.pptx")), DocumentKind::Presentation);
        assert_eq!(DocumentKind::from_path(Path::new("scan.jpeg")), DocumentKind::Image);
        assert_eq!(DocumentKind::from_path(Path::new("notes")), DocumentKind::Other);
        assert_eq!(DocumentKind::from_path(Path::new("x.zip")), DocumentKind::Other);
    }

    #[test]
    fn test_dotted_extension_is_lowercase() {
        assert_eq!(dotted_extension(Path::new("Report.DOCX")), Some(".docx".to_string()));
        assert_eq!(dotted_extension(Path::new("Makefile")), None);
        assert_eq!(dotted_extension(Path::new("archive.tar.gz")), Some(".gz".to_string()));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PDF"), ".pdf");
        assert_eq!(normalize_extension("docx"), ".docx");
        assert_eq!(normalize_extension("  .Xlsx "), ".xlsx");
    }

    #[test]
    fn test_mirror_path_root_level() {
        let out = mirror_path(
            Path::new("/work/docs/a.pdf"),
            Path::new("/work/docs"),
            Path::new("/work/out"),
            "md",
        );
        assert_eq!(out, Some(PathBuf::from("/work/out/a.pdf.md")));
    }

    #[test]
    fn test_mirror_path_nested() {
        let out = mirror_path(
            Path::new("/work/docs/sub/deeper/b.docx"),
            Path::new("/work/docs"),
            Path::new("/work/out"),
            "md",
        );
        assert_eq!(out, Some(PathBuf::from("/work/out/sub/deeper/b.docx.md")));
    }

    #[test]
    fn test_mirror_path_outside_root() {
        let out = mirror_path(
            Path::new("/elsewhere/a.pdf"),
            Path::new("/work/docs"),
            Path::new("/work/out"),
            "md",
        );
        assert!(out.is_none());
    }

    #[test]
    fn test_freshness_rule() {
        assert!(!is_fresh(at(100), None));
        assert!(!is_fresh(at(200), Some(at(100))));
        assert!(is_fresh(at(100), Some(at(100))));
        assert!(is_fresh(at(100), Some(at(150))));
    }

    #[cfg(unix)]
    #[test]
    fn test_mirror_path_keeps_non_utf8_names_distinct() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/work/docs");
        let first = root.join(OsStr::from_bytes(b"r\xffa.pdf"));
        let second = root.join(OsStr::from_bytes(b"r\xfea.pdf"));

        let first_out = mirror_path(&first, root, Path::new("/work/out"), "md").unwrap();
        let second_out = mirror_path(&second, root, Path::new("/work/out"), "md").unwrap();

        assert_ne!(first_out, second_out);
        assert_eq!(
            first_out.file_name().unwrap().as_bytes(),
            b"r\xffa.pdf.md"
        );
    }
}
