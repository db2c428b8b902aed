//! Document loading and text extraction.
//!
//! Reads every supported file under the document folder, extracts plain
//! text per content type, and tags each document with its file name. Also
//! computes the source-folder fingerprint that gates reuse of a persisted
//! index.

use lumen_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
}

impl ContentType {
    /// Detect content type from file extension, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Some(Self::Markdown),
            Some("html") | Some("htm") => Some(Self::Html),
            Some("txt") => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// A loaded source document: extracted text plus its file name.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name of the source (no directory components)
    pub source_file: String,

    /// Extracted plain text
    pub text: String,
}

/// Load every supported document under `folder`.
///
/// Walks the folder recursively, extracts text from each file with a
/// supported extension, and skips unreadable or empty files with a warning.
/// Fails with a "no documents found" error when the folder holds zero
/// supported files.
pub fn load_documents(folder: &Path) -> AppResult<Vec<LoadedDocument>> {
    if !folder.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Document folder does not exist: {:?}",
            folder
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(content_type) = ContentType::from_path(path) else {
            tracing::debug!("Skipping unsupported file: {:?}", path);
            continue;
        };

        let text = match extract_text(path, content_type) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping unreadable file {:?}: {}", path, e);
                continue;
            }
        };

        if text.trim().is_empty() {
            tracing::warn!("Skipping empty document: {:?}", path);
            continue;
        }

        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        documents.push(LoadedDocument { source_file, text });
    }

    if documents.is_empty() {
        return Err(AppError::Knowledge(format!(
            "No documents found in {:?} (supported: txt, md, markdown, html, htm)",
            folder
        )));
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), folder);

    Ok(documents)
}

/// Extract plain text from a source file.
fn extract_text(path: &Path, content_type: ContentType) -> AppResult<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if raw.contains('\0') {
        return Err(AppError::Knowledge("Binary file not supported".to_string()));
    }

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::PlainText => raw,
    };

    Ok(cleaned)
}

/// Strip markdown heading markers, fences, and rules, keeping the prose.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.starts_with("---") {
            continue;
        }

        let content = trimmed.trim_start_matches('#').trim();
        result.push_str(content);
        result.push('\n');
    }

    result.trim().to_string()
}

/// Strip HTML tags along with script and style bodies.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (byte_pos, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = &text[byte_pos..];
            if starts_with_ignore_ascii_case(rest, "<script") {
                in_script = true;
            } else if starts_with_ignore_ascii_case(rest, "</script") {
                in_script = false;
            } else if starts_with_ignore_ascii_case(rest, "<style") {
                in_style = true;
            } else if starts_with_ignore_ascii_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    // Collapse whitespace but preserve paragraph breaks
    let mut cleaned = String::with_capacity(result.len());
    for paragraph in result.split("\n\n") {
        let joined = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        if !joined.is_empty() {
            if !cleaned.is_empty() {
                cleaned.push_str("\n\n");
            }
            cleaned.push_str(&joined);
        }
    }

    cleaned
}

/// Case-insensitive ASCII prefix test at a char boundary.
///
/// Tag names are ASCII, so byte-wise comparison is safe regardless of what
/// multi-byte characters surround the tag.
fn starts_with_ignore_ascii_case(text: &str, prefix: &str) -> bool {
    text.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// Compute a fingerprint of the document folder.
///
/// Hashes the sorted relative paths together with each file's size and
/// modification time. A persisted index whose stored fingerprint differs is
/// stale and gets rebuilt.
pub fn folder_fingerprint(folder: &Path) -> AppResult<String> {
    let mut entries: Vec<String> = Vec::new();

    for entry in WalkDir::new(folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || ContentType::from_path(path).is_none() {
            continue;
        }

        let metadata = fs::metadata(path)?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let rel = path.strip_prefix(folder).unwrap_or(path);
        entries.push(format!(
            "{}:{}:{}",
            rel.to_string_lossy(),
            metadata.len(),
            mtime
        ));
    }

    entries.sort();

    let mut hasher = Sha256::new();
    for entry in &entries {
        hasher.update(entry.as_bytes());
        hasher.update(b"\n");
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("notes.md")),
            Some(ContentType::Markdown)
        );
        assert_eq!(
            ContentType::from_path(Path::new("page.html")),
            Some(ContentType::Html)
        );
        assert_eq!(
            ContentType::from_path(Path::new("tips.txt")),
            Some(ContentType::PlainText)
        );
        assert_eq!(ContentType::from_path(Path::new("image.png")), None);
    }

    #[test]
    fn test_load_documents() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("tips.txt"), "Take deep breaths.").unwrap();
        fs::write(temp.path().join("skip.bin"), [0u8, 1, 2]).unwrap();

        let docs = load_documents(temp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_file, "tips.txt");
        assert_eq!(docs[0].text, "Take deep breaths.");
    }

    #[test]
    fn test_load_documents_empty_folder() {
        let temp = TempDir::new().unwrap();
        let result = load_documents(temp.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("No documents found"));
    }

    #[test]
    fn test_load_documents_missing_folder() {
        let result = load_documents(Path::new("/nonexistent/docs"));
        assert!(result.is_err());
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("Some text"));
        assert!(output.contains("More text"));
        assert!(!output.contains("code"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><body><p>Hello <b>world</b></p><script>var x;</script></body></html>";
        let output = clean_html(input);
        assert_eq!(output, "Hello world");
    }

    #[test]
    fn test_clean_html_mixed_case_tags() {
        let input = "<P>Hello</P><SCRIPT>var x;</SCRIPT><Style>p{}</Style> world";
        let output = clean_html(input);
        assert_eq!(output, "Hello world");
    }

    #[test]
    fn test_clean_html_with_case_shrinking_characters() {
        // Characters whose lowercase form has a different UTF-8 length must
        // not throw off tag detection for tags that follow them.
        let input = format!("{}<p>hi</p><script>var x;</script>", "ẞ".repeat(20));
        let output = clean_html(&input);
        assert!(output.contains("hi"));
        assert!(!output.contains("var x"));

        let input = format!("{}<b>ok</b>", "İ".repeat(20));
        assert!(clean_html(&input).contains("ok"));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "one").unwrap();
        let fp1 = folder_fingerprint(temp.path()).unwrap();

        fs::write(temp.path().join("b.txt"), "two").unwrap();
        let fp2 = folder_fingerprint(temp.path()).unwrap();

        assert_ne!(fp1, fp2);
    }

    #[test]
    fn test_fingerprint_stable() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "one").unwrap();

        let fp1 = folder_fingerprint(temp.path()).unwrap();
        let fp2 = folder_fingerprint(temp.path()).unwrap();
        assert_eq!(fp1, fp2);
    }
}
