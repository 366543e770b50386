//! Snippet extraction for opened declarations

use std::path::Path;

/// Marker inserted where a long snippet was cut
pub const CLIP_MARKER: &str = "    # ... <clipped> ...";

/// Read lines `start..=end` (1-based) of a file.
///
/// Invalid UTF-8 is replaced rather than rejected. Spans running past the end
/// of the file are cut at the last line.
pub fn read_span(path: &Path, start: usize, end: usize) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let start = start.max(1);
    let lines: Vec<&str> = text
        .lines()
        .skip(start - 1)
        .take(end.saturating_sub(start) + 1)
        .collect();
    Ok(lines.join("\n"))
}

/// Keep the head and tail of a snippet longer than `max_lines`.
pub fn clip_lines(snippet: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = snippet.lines().collect();
    if lines.len() <= max_lines || max_lines < 3 {
        if max_lines > 0 && lines.len() > max_lines {
            return lines[..max_lines].join("\n");
        }
        return snippet.to_string();
    }

    let head = max_lines * 2 / 3;
    let tail = max_lines - head - 1;
    let mut clipped: Vec<&str> = Vec::with_capacity(max_lines);
    clipped.extend_from_slice(&lines[..head]);
    clipped.push(CLIP_MARKER);
    clipped.extend_from_slice(&lines[lines.len() - tail..]);
    clipped.join("\n")
}

/// First `max_lines` lines of a snippet.
pub fn head_lines(snippet: &str, max_lines: usize) -> String {
    snippet.lines().take(max_lines).collect::<Vec<_>>().join("\n")
}

/// Truncate to at most `max_chars` characters without splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
