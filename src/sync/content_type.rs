//! Content type resolution for uploaded files.

use std::path::Path;

/// Bytes inspected when the extension says nothing
pub const SNIFF_LEN: usize = 512;

/// Types browsers must get exactly right for a site to render
fn override_for(extension: &str) -> Option<&'static str> {
    match extension {
        "html" | "htm" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css; charset=utf-8"),
        "js" | "mjs" => Some("application/javascript"),
        _ => None,
    }
}

/// Content type from magic bytes
fn sniff(head: &[u8]) -> Option<&'static str> {
    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if head.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    // JPEG: FF D8 FF
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    // WebP: RIFF....WEBP
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if head.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if head.starts_with(&[0x1F, 0x8B, 0x08]) {
        return Some("application/x-gzip");
    }
    if head.starts_with(b"PK\x03\x04") {
        return Some("application/zip");
    }
    if head.starts_with(b"\0asm") {
        return Some("application/wasm");
    }
    if head.starts_with(b"wOFF") {
        return Some("font/woff");
    }
    if head.starts_with(b"wOF2") {
        return Some("font/woff2");
    }

    let text = String::from_utf8_lossy(head);
    let markup = text.trim_start().to_ascii_lowercase();
    if markup.starts_with("<!doctype html") || markup.starts_with("<html") {
        return Some("text/html; charset=utf-8");
    }
    if markup.starts_with("<?xml") {
        return Some("text/xml; charset=utf-8");
    }

    None
}

/// Resolve the content type of `path` whose first bytes are `head`.
///
/// Override table, then the extension table, then magic bytes, then a
/// text/binary fallback.
pub fn resolve(path: &Path, head: &[u8]) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(forced) = extension.as_deref().and_then(override_for) {
        return forced.to_string();
    }

    if extension.is_some() {
        if let Some(guessed) = mime_guess::from_path(path).first_raw() {
            return guessed.to_string();
        }
    }

    let head = &head[..head.len().min(SNIFF_LEN)];
    if let Some(sniffed) = sniff(head) {
        return sniffed.to_string();
    }

    match std::str::from_utf8(head) {
        Ok(_) => "text/plain; charset=utf-8".to_string(),
        Err(e) if e.error_len().is_none() => "text/plain; charset=utf-8".to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}
