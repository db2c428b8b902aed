//! Text chunking with configurable size and overlap.
//!
//! Splits extracted document text into paragraph-aware segments. Paragraphs
//! are packed into chunks up to the size limit; an over-long paragraph falls
//! back to overlapping character windows on UTF-8 boundaries.

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between fallback windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Chunk text into section-level segments.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.len() > chunk_size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(window_split(paragraph, chunk_size, overlap));
            continue;
        }

        if !current.is_empty() && current.len() + paragraph.len() + 2 > chunk_size {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Split an over-long paragraph into overlapping character windows.
fn window_split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let window = text[start..end].trim();

        // Drop a trailing sliver that is mostly overlap with the previous window
        if window.len() < chunk_size / 10 && !chunks.is_empty() {
            break;
        }

        chunks.push(window.to_string());

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        if next_start <= start {
            break;
        }
        start = next_start;
    }

    chunks
}
