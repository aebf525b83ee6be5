//! Static asset embedding
//!
//! Images, videos and HTML fragments are spliced into the page so the final
//! file works offline. Binary files become `data:` URIs:
//!
//! ```text
//! Images/qr.png  ──read──▶  bytes  ──base64──▶  data:image/png;base64,iVBORw0K...
//! ```
//!
//! Videos are only inlined on request since they tend to dominate the output
//! size; otherwise the `<video>` tag points at the file next to the page.

use crate::error::{DeckError, Result};
use crate::render::escape_html;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

/// Read a binary file and base64-encode it
pub fn file_to_base64<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| DeckError::io(path, e))?;
    Ok(STANDARD.encode(bytes))
}

/// Build a `data:` URI for a payload
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Guess a mime type from the file extension
pub fn mime_for<P: AsRef<Path>>(path: P) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        _ => "application/octet-stream",
    }
}

/// Embed an image as a clickable link, e.g. a QR code pointing at the published deck
pub fn image_link_anchor<P: AsRef<Path>>(link: &str, image: P, text: &str, width: u32) -> Result<String> {
    let image = image.as_ref();
    let bytes = std::fs::read(image).map_err(|e| DeckError::io(image, e))?;
    let text = escape_html(text);

    Ok(format!(
        r#"<a title="{text}" target="_blank" href="{link}"><img src="{src}" alt="{text}" width="{width}"/> </a>"#,
        text = text,
        link = escape_html(link),
        src = data_uri(mime_for(image), &bytes),
        width = width,
    ))
}

/// Reference an external HTML page through an `<object>` element
pub fn object_external(src: &str, width: u32, height: u32) -> String {
    let src = escape_html(src);
    format!(
        r#"<object width="{}" height="{}" data="{}">Warning:{} Not Accessible!</object>"#,
        width, height, src, src
    )
}

/// Read an HTML fragment to embed verbatim
pub fn inline_html<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| DeckError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Build a `<video>` tag, inlining the file when `embed` is set
///
/// `src` is the path as it should appear in the page, `path` is where the
/// file is on disk.
pub fn video_tag<P: AsRef<Path>>(path: P, src: &str, width: u32, height: u32, embed: bool) -> Result<String> {
    let path = path.as_ref();
    let mime = match mime_for(path) {
        "application/octet-stream" => "video/mp4",
        m => m,
    };

    let source = if embed {
        let bytes = std::fs::read(path).map_err(|e| DeckError::io(path, e))?;
        data_uri(mime, &bytes)
    } else {
        escape_html(src)
    };

    Ok(format!(
        r#"<video width="{}" height="{}" controls> <source src="{}" type="{}"> Warning:{} could not be included! </video>"#,
        width,
        height,
        source,
        mime,
        escape_html(src)
    ))
}
